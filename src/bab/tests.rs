use super::*;
use crate::config::test::{example_payload, small_payload};
use crate::config::Variant;
use crate::model::compile;
use std::time::Duration;

const LONG: Duration = Duration::from_secs(60);

/// 2 companies with 1 group each, 3 students, 2 terms
fn three_students() -> CompiledModel {
    let payload = small_payload(
        vec![1, 1],
        vec![vec![4, 1, 3], vec![0, 4, 2]],
        vec![vec![4, 0], vec![2, 3], vec![1, 4]],
        2,
        Variant::Simple,
    );
    compile(&payload.validate().unwrap()).unwrap()
}

/// Best objective over all feasible assignments, by enumeration
fn brute_force_optimum(model: &CompiledModel) -> Option<i64> {
    let n = model.vars().len();
    assert!(n <= 16);
    (0u32..(1 << n))
        .map(|mask| (0..n).map(|i| mask & (1 << i) != 0).collect::<Vec<bool>>())
        .filter(|values| model.violations(values).is_empty())
        .map(|values| model.objective_value(&values))
        .min()
}

fn strategy(
    variables: VariableSelection,
    values: ValueSelection,
    seed: Option<u64>,
) -> SearchStrategy {
    SearchStrategy {
        variables,
        values,
        seed,
    }
}

#[test]
fn test_free_set() {
    let mut set = FreeSet::full(5);
    set.remove(1);
    set.remove(4);
    assert_eq!(set.size, 3);
    let mut members: Vec<usize> = (0..set.size).map(|i| set.get(i)).collect();
    members.sort();
    assert_eq!(members, vec![0, 2, 3]);
    set.restore();
    set.restore();
    let mut members: Vec<usize> = (0..set.size).map(|i| set.get(i)).collect();
    members.sort();
    assert_eq!(members, vec![0, 1, 2, 3, 4]);
    for v in 0..5 {
        assert_eq!(set.get(set.position[v]), v);
    }
}

#[test]
fn test_propagation() {
    let model = three_students();
    let watches = watches(&model);
    let strategy = SearchStrategy::default();
    let mut worker = Worker::new(&model, &watches, &strategy, SmallRng::seed_from_u64(0));
    assert!(worker.propagate());
    assert_eq!(worker.trail.len(), 0);

    let vars = model.vars();
    worker.fix(vars.var(0, 0, 1).index(), true);
    assert!(worker.propagate());
    // one unit per term, then once per unit, then one unit per term in the other term
    assert_eq!(worker.domains[vars.var(1, 0, 1).index()], Domain::False);
    assert_eq!(worker.domains[vars.var(0, 1, 1).index()], Domain::False);
    assert_eq!(worker.domains[vars.var(1, 1, 1).index()], Domain::True);
    assert_eq!(worker.trail.len(), 4);
    assert_eq!(worker.free.size, vars.len() - 4);

    worker.undo(0);
    assert!(worker.domains.iter().all(|d| *d == Domain::Free));
    assert!(worker.num_true.iter().all(|n| *n == 0));
    assert_eq!(worker.free.size, vars.len());
}

#[test]
fn test_propagation_conflict() {
    let model = three_students();
    let watches = watches(&model);
    let strategy = SearchStrategy::default();
    let mut worker = Worker::new(&model, &watches, &strategy, SmallRng::seed_from_u64(0));
    assert!(worker.propagate());

    let vars = model.vars();
    // two units for the same student in the same term
    worker.fix(vars.var(0, 0, 2).index(), true);
    worker.fix(vars.var(1, 0, 2).index(), true);
    assert!(!worker.propagate());
    assert!(worker.queue.is_empty());
    assert!(worker.queued.iter().all(|q| !q));
}

#[test]
fn test_luby_sequence() {
    let sequence: Vec<u64> = (1..=15).map(luby).collect();
    assert_eq!(sequence, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
}

#[test]
fn test_demand_value_selection() {
    let model = three_students();
    let watches = watches(&model);
    let strategy = strategy(VariableSelection::Random, ValueSelection::Demand, None);
    let mut worker = Worker::new(&model, &watches, &strategy, SmallRng::seed_from_u64(0));
    assert!(worker.propagate());

    let vars = model.vars();
    // every headcount floor (1) is still unmet
    assert!(worker.first_value(vars.var(0, 0, 0).index()));
    worker.fix(vars.var(0, 0, 1).index(), true);
    assert!(worker.propagate());
    assert!(!worker.first_value(vars.var(0, 0, 0).index()));
    assert!(worker.first_value(vars.var(1, 0, 0).index()));
}

#[test]
fn test_finds_optimum() {
    let model = three_students();
    let optimum = brute_force_optimum(&model).unwrap();

    for variables in [VariableSelection::Random, VariableSelection::First] {
        for values in [
            ValueSelection::MaxValue,
            ValueSelection::MinValue,
            ValueSelection::Demand,
        ] {
            let solution = BranchAndBound::new(1)
                .search(&model, &strategy(variables, values, Some(11)), LONG)
                .unwrap();
            assert_eq!(solution.objective(), optimum, "{:?}/{:?}", variables, values);
            assert_eq!(model.objective_value(solution.values()), optimum);
            assert!(model.violations(solution.values()).is_empty());
        }
    }
}

#[test]
fn test_parallel_finds_optimum() {
    let model = three_students();
    let optimum = brute_force_optimum(&model).unwrap();
    let solution = BranchAndBound::new(4)
        .search(&model, &SearchStrategy::default(), LONG)
        .unwrap();
    assert_eq!(solution.objective(), optimum);
    assert!(model.violations(solution.values()).is_empty());
}

#[test]
fn test_grouped_optimum() {
    let payload = small_payload(
        vec![2],
        vec![vec![4, 0]],
        vec![vec![4], vec![0]],
        2,
        Variant::Grouped,
    );
    let model = compile(&payload.validate().unwrap()).unwrap();
    let optimum = brute_force_optimum(&model).unwrap();
    let strategy = strategy(VariableSelection::Random, ValueSelection::Demand, Some(5));
    let solution = BranchAndBound::new(2)
        .search(&model, &strategy, LONG)
        .unwrap();
    assert_eq!(solution.objective(), optimum);
}

#[test]
fn test_seeded_search_is_reproducible() {
    let model = three_students();
    let strategy = strategy(VariableSelection::Random, ValueSelection::MaxValue, Some(42));
    let first = BranchAndBound::new(1).search(&model, &strategy, LONG).unwrap();
    let second = BranchAndBound::new(1).search(&model, &strategy, LONG).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_infeasible() {
    // 4 students, 2 companies with at most 1 student each
    let mut payload = small_payload(
        vec![1, 1],
        vec![vec![4, 4, 4, 4], vec![4, 4, 4, 4]],
        vec![vec![4, 4]; 4],
        2,
        Variant::Simple,
    );
    payload.headcount_cap = Some(1);
    let model = compile(&payload.validate().unwrap()).unwrap();
    assert_eq!(
        BranchAndBound::new(2).search(&model, &SearchStrategy::default(), LONG),
        None
    );
}

#[test]
fn test_zero_time_limit() {
    let model = compile(&example_payload().validate().unwrap()).unwrap();
    assert_eq!(
        BranchAndBound::new(1).search(&model, &SearchStrategy::default(), Duration::ZERO),
        None
    );
}
