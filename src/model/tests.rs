use super::constraints::ConstraintKind;
use super::{compile, CompiledModel, ModelBuilder};
use crate::config::test::{example_payload, small_payload};
use crate::config::{GroupedWeights, Variant};
use crate::ratings::CombinedRatings;
use crate::units::UnitLayout;
use crate::Error;

/// 2 companies, 2 students, 2 terms. Combined ratings: c0 = [100, 50], c1 = [0, 100].
fn two_by_two() -> CompiledModel {
    let payload = small_payload(
        vec![1, 1],
        vec![vec![4, 2], vec![0, 4]],
        vec![vec![4, 0], vec![2, 4]],
        2,
        Variant::Simple,
    );
    compile(&payload.validate().unwrap()).unwrap()
}

/// Build a complete assignment from the list of true (unit, term, student) triples
fn assignment(model: &CompiledModel, assigned: &[(usize, usize, usize)]) -> Vec<bool> {
    let mut values = vec![false; model.vars().len()];
    for (u, t, s) in assigned {
        values[model.vars().var(*u, *t, *s).index()] = true;
    }
    values
}

#[test]
fn test_model_sizes() {
    let model = compile(&example_payload().validate().unwrap()).unwrap();
    assert_eq!(model.vars().dim(), (4, 2, 6));
    assert_eq!(model.vars().len(), 48);
    assert_eq!(model.constraints().len(), 12 + 24 + 8);
    assert_eq!(model.metrics().headcounts.dim(), (4, 2));
    assert_eq!(model.metrics().dissatisfaction.assigned.dim(), (4, 2, 6));
    assert!(model.metrics().delta().is_some());
    assert!(model.metrics().duplicates().is_none());
    assert_eq!(model.objective().step, 1);
    assert!(model.objective().expr.index() == model.exprs().len() - 1);
}

#[test]
fn test_simple_metrics_balanced() {
    let model = two_by_two();
    assert_eq!(model.ratings().get(0, 1), 50);
    assert_eq!(model.ratings().get(1, 0), 0);
    let values = assignment(&model, &[(0, 0, 0), (1, 0, 1), (1, 1, 0), (0, 1, 1)]);
    assert!(model.violations(&values).is_empty());

    let exprs = model.exprs();
    let metrics = model.metrics();
    for hc in metrics.headcounts.iter() {
        assert_eq!(exprs.value(&values, *hc), 1);
    }
    let delta = metrics.delta().unwrap();
    assert_eq!(exprs.value(&values, delta.total), 0);
    assert_eq!(exprs.value(&values, delta.var), 0);

    let d = &metrics.dissatisfaction;
    assert_eq!(exprs.value(&values, d.assigned[[1, 1, 0]]), 100);
    assert_eq!(exprs.value(&values, d.assigned[[0, 1, 1]]), 50);
    assert_eq!(exprs.value(&values, d.assigned[[0, 0, 1]]), 0);
    assert_eq!(exprs.value(&values, d.total), 150);
    // 150 / 8 = 18; (3 * 324 + 6724 + 1024 + 3 * 324) / 8 = 9692 / 8 = 1211
    assert_eq!(exprs.value(&values, d.avg), 18);
    assert_eq!(exprs.value(&values, d.var), 1211);

    // 60 * 0 + 40 * (20 * 150 + 80 * 1211)
    assert_eq!(model.objective_value(&values), 3_995_200);
}

#[test]
fn test_simple_metrics_unbalanced() {
    let model = two_by_two();
    let values = assignment(&model, &[(0, 0, 0), (0, 0, 1), (1, 1, 0), (1, 1, 1)]);

    let exprs = model.exprs();
    let delta = model.metrics().delta().unwrap();
    assert_eq!(exprs.value(&values, delta.deltas[[0, 0]]), 1);
    assert_eq!(exprs.value(&values, delta.deltas[[0, 1]]), -1);
    assert_eq!(exprs.value(&values, delta.abs_deltas[[0, 1]]), 1);
    assert_eq!(exprs.value(&values, delta.total), 4);
    assert_eq!(exprs.value(&values, delta.avg), 1);
    assert_eq!(exprs.value(&values, delta.var), 1);
    assert_eq!(model.objective_value(&values), 60 * (20 * 4 + 80) + 3_995_200);

    let violations: Vec<ConstraintKind> =
        model.violations(&values).iter().map(|c| c.kind).collect();
    assert_eq!(
        violations,
        vec![
            ConstraintKind::HeadcountFloor { unit: 0, term: 1 },
            ConstraintKind::HeadcountFloor { unit: 1, term: 0 },
        ]
    );
}

#[test]
fn test_grouped_duplicates() {
    let payload = small_payload(
        vec![2],
        vec![vec![4, 0]],
        vec![vec![4], vec![0]],
        2,
        Variant::Grouped,
    );
    let model = compile(&payload.validate().unwrap()).unwrap();
    assert_eq!(model.vars().dim(), (2, 2, 2));
    assert!(model.metrics().delta().is_none());

    let values = assignment(&model, &[(0, 0, 0), (1, 0, 1), (1, 1, 0), (0, 1, 1)]);
    assert!(model.violations(&values).is_empty());

    let exprs = model.exprs();
    let duplicates = model.metrics().duplicates().unwrap();
    assert_eq!(exprs.value(&values, duplicates.combined_assignments[[0, 0]]), 1);
    assert_eq!(exprs.value(&values, duplicates.combined_assignments[[1, 0]]), 1);
    assert_eq!(exprs.value(&values, duplicates.duplicates[[0, 0]]), 1);
    assert_eq!(exprs.value(&values, duplicates.duplicates[[0, 1]]), 1);
    assert_eq!(exprs.value(&values, duplicates.company_duplicates[0]), 2);
    assert_eq!(exprs.value(&values, duplicates.total), 2);

    let d = &model.metrics().dissatisfaction;
    assert_eq!(exprs.value(&values, d.avg), 25);
    assert_eq!(exprs.value(&values, d.var), 1875);
    // (20 * 100 * 25 + 80 * 1875) / 100 = 2000; (80 * 2 + 20 * 2000) / 100 = 401
    assert_eq!(model.objective_value(&values), 401);
}

#[test]
fn test_grouped_custom_weights() {
    let mut payload = small_payload(
        vec![2],
        vec![vec![4, 0]],
        vec![vec![4], vec![0]],
        2,
        Variant::Grouped,
    );
    payload.weights.grouped = GroupedWeights {
        avg_dissatisfaction: 30,
        var_dissatisfaction: 70,
        dissatisfaction: 10,
        duplicates: 90,
    };
    let model = compile(&payload.validate().unwrap()).unwrap();
    let values = assignment(&model, &[(0, 0, 0), (1, 0, 1), (1, 1, 0), (0, 1, 1)]);
    // avg 25, var 1875, 2 duplicates:
    // (30 * 100 * 25 + 70 * 1875) / 100 = 2062; (90 * 2 + 10 * 2062) / 100 = 208
    assert_eq!(model.objective_value(&values), 208);
}

#[test]
fn test_duplicates_zero_for_single_exposure() {
    // 2 companies with 2 groups each, 2 students, 2 terms: each student visits both companies once
    let payload = small_payload(
        vec![2, 2],
        vec![vec![4, 4], vec![4, 4]],
        vec![vec![4, 4], vec![4, 4]],
        2,
        Variant::Grouped,
    );
    let model = compile(&payload.validate().unwrap()).unwrap();
    let values = assignment(&model, &[(0, 0, 0), (2, 0, 1), (3, 1, 0), (1, 1, 1)]);
    let exprs = model.exprs();
    let duplicates = model.metrics().duplicates().unwrap();
    assert_eq!(exprs.value(&values, duplicates.total), 0);
    // all ratings are 100, no dissatisfaction at all
    assert_eq!(model.objective_value(&values), 0);
    // target 2 / 4 = 0, so every group may hold 0 or 1 students
    assert!(model.violations(&values).is_empty());
}

#[test]
fn test_empty_aggregate() {
    let problem = example_payload().validate().unwrap();
    let layout =
        UnitLayout::resolve(&problem.groups, problem.num_students, Variant::Simple).unwrap();
    let ratings =
        CombinedRatings::combine(&problem.company_ratings, &problem.student_ratings, &layout)
            .unwrap();
    let result = ModelBuilder::new(layout, ratings, 0).build(&problem.weights);
    assert!(matches!(result, Err(Error::EmptyAggregate("unit × term"))));
}

#[test]
fn test_objective_overflow() {
    let mut payload = example_payload();
    payload.weights.delta.obj = u32::MAX;
    payload.weights.delta.var = u32::MAX;
    payload.weights.satisfaction.obj = u32::MAX;
    payload.weights.satisfaction.var = u32::MAX;
    let result = compile(&payload.validate().unwrap());
    assert!(matches!(result, Err(Error::ObjectiveOverflow)));

    let mut payload = example_payload();
    payload.weights.delta.obj = 1_000_000;
    payload.weights.delta.var = 1_000_000;
    payload.weights.satisfaction.obj = 1_000_000;
    payload.weights.satisfaction.var = 1_000_000;
    assert!(compile(&payload.validate().unwrap()).is_ok());
}
