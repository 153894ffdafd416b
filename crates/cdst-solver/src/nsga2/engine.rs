//! `EvolutionEngine` trait and the NSGA-II implementation.
//!
//! The scheduler depends on the trait, not on NSGA-II specifically, so an
//! alternative algorithm can slot in without touching call sites.

use crate::allocation::{AllocationTensor, Fitness, Individual};
use crate::fitness::FitnessEvaluator;
use crate::nsga2::operators::{
    capacity_balanced_allocation, crossover, greedy_allocation, mutate, random_allocation, repair,
    tournament_select,
};
use crate::nsga2::sorting::{assign_crowding_distance, fast_non_dominated_sort};
use crate::parameters::Parameters;
use crate::problem::Problem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::collections::VecDeque;
use std::time::Instant;

/// Cap on the fitness-evaluation worker pool; evaluation parallelism past
/// this stops paying for itself on the population sizes this engine runs.
const MAX_EVAL_WORKERS: usize = 8;

/// Where a run currently sits in its lifecycle, reported alongside each
/// progress frame so a caller can distinguish "hasn't produced a
/// generation yet" and "wrapping up" from ordinary evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initializing,
    Evolving,
    Finalizing,
}

/// One generation's worth of progress, reported back to callers (the
/// scheduler threads this into its progress-frame broadcast).
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub stage: Stage,
    pub generation: usize,
    pub max_generations: usize,
    pub best_composite: f64,
    pub mean_composite: f64,
    pub front_zero_size: usize,
    /// Approximate hypervolume of front zero against the run's fixed
    /// reference point; non-decreasing under elitism.
    pub hypervolume: f64,
    pub elapsed_seconds: f64,
    /// Estimated seconds remaining, extrapolated from the average
    /// per-generation wall-clock cost so far. `None` before generation 1
    /// has completed, when there's nothing yet to extrapolate from.
    pub eta_seconds: Option<f64>,
}

/// The outcome of a full run: the final Pareto front plus how many
/// generations it took.
#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub population: Vec<Individual>,
    pub pareto_front: Vec<usize>,
    pub generations_run: usize,
    pub converged_early: bool,
}

/// Capability an optimization algorithm must provide to be driven by the
/// scheduler. Kept narrow and synchronous; the scheduler is what adds
/// cancellation and progress plumbing around it.
pub trait EvolutionEngine {
    /// Run to convergence or `max_generations`. `seed_population`, when
    /// `Some`, resumes from a previously checkpointed population instead
    /// of starting from fresh allocations — padded out with random
    /// individuals if it's short of `population_size`.
    fn run(
        &self,
        problem: &Problem,
        parameters: &Parameters,
        seed_population: Option<Vec<Individual>>,
        on_generation: &mut dyn FnMut(&GenerationReport, &[Individual]) -> bool,
    ) -> EvolutionOutcome;
}

/// Deterministic (given a fixed `random_seed`) NSGA-II implementation.
pub struct Nsga2Engine;

/// Approximate hypervolume of front zero against a fixed reference point:
/// the sum of each member's dominated box volume, without deduplicating
/// overlap between members. Cheap and monotone in the right direction,
/// which is all the convergence check needs — not a substitute for an
/// exact hypervolume indicator.
fn hypervolume_proxy(vectors: &[[f64; 5]], reference: &[f64; 5]) -> f64 {
    vectors
        .iter()
        .map(|v| {
            v.iter()
                .zip(reference.iter())
                .map(|(value, r)| (r - value).max(0.0))
                .product::<f64>()
        })
        .sum()
}

/// The run-wide hypervolume reference: the objective-wise worst values of
/// the initial population, pushed 10% further out so boundary individuals
/// still dominate a nonzero box.
fn hypervolume_reference(population: &[Individual]) -> [f64; 5] {
    let mut worst = [f64::NEG_INFINITY; 5];
    for individual in population {
        let v = individual.fitness.expect("unevaluated individual").objectives.as_array();
        for d in 0..5 {
            worst[d] = worst[d].max(v[d]);
        }
    }
    let mut reference = [0.0; 5];
    for d in 0..5 {
        reference[d] = worst[d] + 0.1 * worst[d].abs() + 1e-9;
    }
    reference
}

/// Mean pairwise Euclidean distance between population members in
/// objective space — a population collapsed onto a single point scores
/// near zero.
fn mean_pairwise_distance(vectors: &[[f64; 5]]) -> f64 {
    let n = vectors.len();
    if n < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = vectors[i]
                .iter()
                .zip(vectors[j].iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            sum += d;
            pairs += 1;
        }
    }
    sum / pairs as f64
}

fn variance(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return f64::INFINITY;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn objective_vectors<'a>(individuals: impl Iterator<Item = &'a Individual>) -> Vec<[f64; 5]> {
    individuals
        .map(|i| i.fitness.expect("unevaluated individual").objectives.as_array())
        .collect()
}

impl Nsga2Engine {
    fn rank_and_crowd(&self, population: &mut [Individual]) -> Vec<Vec<usize>> {
        let fronts = fast_non_dominated_sort(population);
        for (rank, front) in fronts.iter().enumerate() {
            for &idx in front {
                population[idx].rank = rank;
            }
            assign_crowding_distance(population, front);
        }
        fronts
    }

    /// The initialization mix: 30% random splits, 40% greedy nearest-first
    /// fills, 30% capacity-balanced splits, all repaired to feasibility.
    fn initial_allocations(
        &self,
        problem: &Problem,
        population_size: usize,
        rng: &mut StdRng,
    ) -> Vec<AllocationTensor> {
        let n_random = population_size * 3 / 10;
        let n_greedy = population_size * 4 / 10;
        let mut allocations = Vec::with_capacity(population_size);
        for _ in 0..n_random {
            allocations.push(random_allocation(problem, rng));
        }
        for _ in 0..n_greedy {
            allocations.push(greedy_allocation(problem, rng));
        }
        while allocations.len() < population_size {
            allocations.push(capacity_balanced_allocation(problem, rng));
        }
        allocations
    }

    fn next_generation(
        &self,
        problem: &Problem,
        parameters: &Parameters,
        population: &[Individual],
        generation: usize,
        rng: &mut StdRng,
    ) -> Vec<AllocationTensor> {
        let algorithm = &parameters.algorithm;
        let progress_left = 1.0 - generation as f64 / algorithm.max_generations.max(1) as f64;
        let mutation_rate =
            (algorithm.mutation_rate * progress_left).max(algorithm.mutation_rate / 10.0);
        let sigma = (problem.max_demand() as f64 * 0.1 * progress_left).max(1.0);

        let pop_size = algorithm.population_size;
        let mut offspring = Vec::with_capacity(pop_size);
        while offspring.len() < pop_size {
            let p1 = tournament_select(population, algorithm.tournament_size, rng);
            let p2 = tournament_select(population, algorithm.tournament_size, rng);
            let (mut c1, mut c2) = if rng.gen_bool(algorithm.crossover_rate) {
                crossover(&population[p1].allocation, &population[p2].allocation, rng)
            } else {
                (population[p1].allocation.clone(), population[p2].allocation.clone())
            };
            mutate(problem, &mut c1, mutation_rate, sigma, rng);
            mutate(problem, &mut c2, mutation_rate, sigma, rng);
            repair(problem, &mut c1);
            repair(problem, &mut c2);
            offspring.push(c1);
            if offspring.len() < pop_size {
                offspring.push(c2);
            }
        }
        offspring
    }
}

impl EvolutionEngine for Nsga2Engine {
    fn run(
        &self,
        problem: &Problem,
        parameters: &Parameters,
        seed_population: Option<Vec<Individual>>,
        on_generation: &mut dyn FnMut(&GenerationReport, &[Individual]) -> bool,
    ) -> EvolutionOutcome {
        let start = Instant::now();
        let max_generations = parameters.algorithm.max_generations;
        let mut rng = match parameters.algorithm.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let evaluator = FitnessEvaluator::new(problem, *parameters);

        let workers = num_cpus::get().min(MAX_EVAL_WORKERS);
        let eval_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("building fitness evaluation thread pool");

        let mut seeded: Vec<Individual> = seed_population.unwrap_or_default();
        seeded.truncate(parameters.algorithm.population_size);
        if seeded.len() < parameters.algorithm.population_size {
            let missing = parameters.algorithm.population_size - seeded.len();
            let fill = if seeded.is_empty() {
                self.initial_allocations(problem, missing, &mut rng)
            } else {
                (0..missing).map(|_| random_allocation(problem, &mut rng)).collect()
            };
            seeded.extend(fill.into_iter().map(Individual::new));
        }
        let initial_allocations: Vec<AllocationTensor> =
            seeded.iter().map(|i| i.allocation.clone()).collect();
        let initial_fitnesses =
            eval_pool.install(|| evaluator.evaluate_batch(&initial_allocations));
        let mut population: Vec<Individual> = seeded
            .into_iter()
            .zip(initial_fitnesses)
            .map(|(mut individual, fitness)| {
                individual.fitness = Some(fitness);
                individual
            })
            .collect();
        self.rank_and_crowd(&mut population);

        // Fixed for the whole run, so hypervolume is comparable (and
        // non-decreasing under elitism) across generations.
        let reference = hypervolume_reference(&population);
        let mut last_hypervolume = hypervolume_proxy(
            &objective_vectors(population.iter().filter(|i| i.rank == 0)),
            &reference,
        );

        on_generation(&GenerationReport {
            stage: Stage::Initializing,
            generation: 0,
            max_generations,
            best_composite: population.iter().map(|i| i.fitness.unwrap().composite).fold(f64::INFINITY, f64::min),
            mean_composite: population.iter().map(|i| i.fitness.unwrap().composite).sum::<f64>() / population.len() as f64,
            front_zero_size: population.iter().filter(|i| i.rank == 0).count(),
            hypervolume: last_hypervolume,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            eta_seconds: None,
        }, &population);

        let mut hypervolume_window: VecDeque<f64> = VecDeque::with_capacity(parameters.algorithm.convergence_window);
        let mut generations_run = 0usize;
        let mut converged_early = false;

        for generation in 1..=max_generations {
            let offspring_allocations =
                self.next_generation(problem, parameters, &population, generation, &mut rng);
            let offspring_fitnesses =
                eval_pool.install(|| evaluator.evaluate_batch(&offspring_allocations));
            let offspring: Vec<Individual> = offspring_allocations
                .into_iter()
                .zip(offspring_fitnesses)
                .map(|(allocation, fitness)| {
                    let mut individual = Individual::new(allocation);
                    individual.fitness = Some(fitness);
                    individual
                })
                .collect();

            let mut combined: Vec<Individual> = population.into_iter().chain(offspring).collect();

            // Parents were normalized against their own generation's spread;
            // rescore everyone against the union before survivor selection
            // compares composites across the two groups.
            let mut fitnesses: Vec<Fitness> =
                combined.iter().map(|i| i.fitness.expect("unevaluated individual")).collect();
            evaluator.renormalize(&mut fitnesses);
            for (individual, fitness) in combined.iter_mut().zip(fitnesses) {
                individual.fitness = Some(fitness);
            }

            let fronts = self.rank_and_crowd(&mut combined);

            let elite_size = parameters
                .algorithm
                .elite_size
                .min(parameters.algorithm.population_size);
            let mut elite_order: Vec<usize> = (0..combined.len()).collect();
            elite_order.sort_by(|&a, &b| {
                combined[a]
                    .fitness
                    .unwrap()
                    .composite
                    .partial_cmp(&combined[b].fitness.unwrap().composite)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let elites: HashSet<usize> = elite_order.iter().take(elite_size).copied().collect();

            let mut next_population = Vec::with_capacity(parameters.algorithm.population_size);
            for &idx in elite_order.iter().take(elite_size) {
                next_population.push(combined[idx].clone_for_survival());
            }

            'fronts: for front in &fronts {
                let remaining_front: Vec<usize> = front.iter().copied().filter(|idx| !elites.contains(idx)).collect();
                if remaining_front.is_empty() {
                    continue;
                }
                if next_population.len() + remaining_front.len() <= parameters.algorithm.population_size {
                    for idx in remaining_front {
                        next_population.push(combined[idx].clone_for_survival());
                    }
                } else {
                    let mut sorted_front = remaining_front;
                    sorted_front.sort_by(|&a, &b| {
                        combined[b]
                            .crowding_distance
                            .partial_cmp(&combined[a].crowding_distance)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    let remaining = parameters.algorithm.population_size - next_population.len();
                    for idx in sorted_front.into_iter().take(remaining) {
                        next_population.push(combined[idx].clone_for_survival());
                    }
                    break 'fronts;
                }
            }
            population = next_population;
            generations_run = generation;

            let best = population.iter().map(|i| i.fitness.unwrap().composite).fold(f64::INFINITY, f64::min);
            let mean = population.iter().map(|i| i.fitness.unwrap().composite).sum::<f64>() / population.len() as f64;
            let front_zero_size = population.iter().filter(|i| i.rank == 0).count();

            let current_hypervolume = hypervolume_proxy(
                &objective_vectors(population.iter().filter(|i| i.rank == 0)),
                &reference,
            );
            last_hypervolume = current_hypervolume;
            if hypervolume_window.len() >= parameters.algorithm.convergence_window {
                hypervolume_window.pop_front();
            }
            hypervolume_window.push_back(current_hypervolume);

            let diversity = mean_pairwise_distance(&objective_vectors(population.iter()));

            let elapsed = start.elapsed().as_secs_f64();
            let eta_seconds = Some((elapsed / generation as f64) * (max_generations - generation) as f64);

            let report = GenerationReport {
                stage: Stage::Evolving,
                generation,
                max_generations,
                best_composite: best,
                mean_composite: mean,
                front_zero_size,
                hypervolume: current_hypervolume,
                elapsed_seconds: elapsed,
                eta_seconds,
            };
            let keep_going = on_generation(&report, &population);

            let window_full = hypervolume_window.len() >= parameters.algorithm.convergence_window;
            let hypervolume_converged = window_full
                && variance(&hypervolume_window) < parameters.algorithm.convergence_threshold;
            // The diversity floor alone isn't a stop signal: a collapsed
            // population that is still pushing the front outward deserves
            // more generations. Both must hold.
            let improvement_stalled = window_full
                && (current_hypervolume - hypervolume_window.front().copied().unwrap_or(0.0))
                    < parameters.algorithm.convergence_threshold;
            let diversity_exhausted =
                diversity < parameters.algorithm.diversity_threshold && improvement_stalled;
            let time_exhausted = parameters
                .algorithm
                .time_budget_seconds
                .is_some_and(|budget| elapsed >= budget);

            if !keep_going {
                converged_early = true;
                break;
            }
            if hypervolume_converged || diversity_exhausted || time_exhausted {
                converged_early = true;
                break;
            }
        }

        let pareto_front = self
            .rank_and_crowd(&mut population)
            .into_iter()
            .next()
            .unwrap_or_default();

        on_generation(&GenerationReport {
            stage: Stage::Finalizing,
            generation: generations_run,
            max_generations,
            best_composite: population.iter().map(|i| i.fitness.unwrap().composite).fold(f64::INFINITY, f64::min),
            mean_composite: population.iter().map(|i| i.fitness.unwrap().composite).sum::<f64>() / population.len() as f64,
            front_zero_size: population.iter().filter(|i| i.rank == 0).count(),
            hypervolume: last_hypervolume,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            eta_seconds: Some(0.0),
        }, &population);

        EvolutionOutcome {
            population,
            pareto_front,
            generations_run,
            converged_early,
        }
    }
}

impl Individual {
    /// Shallow clone used when copying survivors into the next
    /// generation's population; kept as a named method rather than a
    /// bare `.clone()` call so elitism's intent reads at the call site.
    fn clone_for_survival(&self) -> Self {
        self.clone()
    }
}
