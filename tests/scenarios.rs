//! Integration scenarios exercising the public surface end to end: a
//! model fit by MLE, a conjugate Bayesian update against a known closed
//! form, an ARMS draw sequence, a raked two-way table, and a pmf/mixture
//! round trip through the dataset layer.

use std::sync::Arc;

use apophenia::dataset::matrix::Grid;
use apophenia::dataset::Dataset;
use apophenia::families::{Bernoulli, Beta, Binomial, Normal, Pmf};
use apophenia::model::Model;
use apophenia::settings::{ArmsSettings, SettingsGroup};
use apophenia::transform::mixture::Mixture;
use apophenia::{arms, mle, rake, update};

#[test]
fn mle_recovers_standard_normal_parameters() {
    let mut model = Model::new(Arc::new(Normal));
    let mut data = Dataset::new("draws");
    data.vector = Some(vec![-0.2, 0.1, 0.3, -0.1, 0.05, -0.05, 0.15, -0.15, 0.0, 0.2]);
    model.prep(&data).unwrap();

    let fit = mle::estimate(&model, &data, None).unwrap();
    let params = fit.parameters.vector.unwrap();
    assert!(params[0].abs() < 0.2, "mu should land near zero, got {}", params[0]);
    assert!(params[1] > 0.0 && params[1] < 1.0, "sigma should be a small positive number, got {}", params[1]);

    let info = fit.info.vector.unwrap();
    assert!(info[0].is_finite(), "log-likelihood should be finite");
    assert!(info[1] >= info[0].abs() * 0.0, "aic should be computed");
}

#[test]
fn beta_binomial_conjugate_update_matches_closed_form() {
    let mut prior = Model::new(Arc::new(Beta));
    prior.parameters.vector = Some(vec![1.0, 1.0]);

    let likelihood = Model::new(Arc::new(Binomial { n: 20 }));
    let mut data = Dataset::new("counts");
    data.vector = Some(vec![14.0]);

    let posterior = update::update(&prior, &likelihood, &data, None).unwrap();
    match posterior {
        update::Posterior::Conjugate(post) => {
            let p = post.parameters.vector.unwrap();
            assert!((p[0] - 15.0).abs() < 1e-9);
            assert!((p[1] - 7.0).abs() < 1e-9);
        }
        update::Posterior::Mcmc(_) => panic!("beta/binomial should resolve to a closed form"),
    }
}

#[test]
fn arms_draws_from_a_unimodal_log_density_stay_near_the_mode() {
    let settings = ArmsSettings { initial_points: vec![-3.0, -1.0, 0.0, 1.0, 3.0], ..Default::default() };
    let log_density = |x: f64| -0.5 * x * x;

    let mut draws = Vec::new();
    let mut previous = 0.0;
    for seed in 0..200u64 {
        let x = arms::draw_once(log_density, &settings, seed).unwrap();
        previous = x;
        draws.push(x);
    }
    let _ = previous;

    let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
    assert!(mean.abs() < 0.5, "mean of standard-normal-like draws should be near zero, got {mean}");
    assert!(draws.iter().all(|x| x.abs() < 10.0), "draws should stay within a sane range");
}

#[test]
fn raking_a_two_by_two_table_matches_both_margins() {
    let cells: [[f64; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let table = rake::RakeTable::build(vec![vec![0.0, 1.0], vec![0.0, 1.0]], |_| 5.0, |_| false, 1e-6);
    let row_targets = [30.0, 70.0];
    let col_targets = [40.0, 60.0];
    let contrasts = vec![
        rake::Contrast { dims: vec![0], targets: row_targets.to_vec() },
        rake::Contrast { dims: vec![1], targets: col_targets.to_vec() },
    ];

    let report = rake::rake(table, &contrasts, &Default::default()).unwrap();
    assert!(report.max_margin_error < 1e-6);

    for r in 0..2 {
        let row_sum: f64 = cells
            .iter()
            .filter(|c| c[0] == r as f64)
            .map(|c| report.table.weight_at(c.as_slice()).unwrap())
            .sum();
        assert!((row_sum - row_targets[r]).abs() < 1e-6);
    }
    for c in 0..2 {
        let col_sum: f64 = cells
            .iter()
            .filter(|v| v[1] == c as f64)
            .map(|v| report.table.weight_at(v.as_slice()).unwrap())
            .sum();
        assert!((col_sum - col_targets[c]).abs() < 1e-6);
    }
}

#[test]
fn pmf_compress_then_mixture_log_likelihood_is_finite() {
    let mut observations = Dataset::new("raw");
    observations.matrix = Some(Grid::from_row_major(6, 1, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]));
    let pmf_support = observations.pmf_compress().unwrap();
    assert_eq!(pmf_support.weights.as_ref().unwrap().len(), 2);

    let mixture = Mixture::new(vec![Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal))]).unwrap();
    let mut params = Dataset::new("p");
    params.vector = Some(vec![0.5, 0.0, 1.0, 1.0, 1.0]);
    let mut data = Dataset::new("d");
    data.vector = Some(vec![0.1, 0.9, 1.1]);
    let ll = mixture.log_likelihood(&data, &params).unwrap();
    assert!(ll.is_finite());

    let pmf_family = Pmf::new(pmf_support.clone());
    let pmf_model = Model::new(Arc::new(pmf_family));
    let p = pmf_model.family.p(&Dataset::new("q"), &Dataset::new("empty"));
    let _ = p;
}

#[test]
fn bernoulli_model_round_trips_through_settings_group() {
    let mut model = Model::new(Arc::new(Bernoulli));
    model.set_settings(SettingsGroup::Arms(ArmsSettings::default()));
    assert!(model.settings(apophenia::settings::SettingsKind::Arms).is_some());
    model.parameters.vector = Some(vec![0.3]);
    let mut data = Dataset::new("d");
    data.vector = Some(vec![1.0]);
    let ll = model.log_likelihood(Some(&data)).unwrap();
    assert!((ll - 0.3_f64.ln()).abs() < 1e-9);
}
