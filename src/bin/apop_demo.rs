//! Demo CLI: walks the toolkit end to end against synthetic data — fit a
//! normal by maximum likelihood, draw from it with MCMC, update a beta
//! prior against Bernoulli trials, and rake a 2x2 table to known margins.
//!
//! Flags select which scenario to run; with none given, all of them run
//! in sequence.

use std::env;
use std::sync::Arc;

use apophenia::dataset::Dataset;
use apophenia::families::{Bernoulli, Beta, Normal};
use apophenia::model::Model;
use apophenia::settings::{MleSettings, SettingsGroup};
use apophenia::{mcmc, mle, options, rake, update};

fn parse_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn init_logging() {
    let level = match options::global().verbosity {
        options::Verbosity::Silent => "off",
        options::Verbosity::Warnings => "warn",
        options::Verbosity::Informational => "info",
        options::Verbosity::Trace => "debug",
    };
    let _ = tracing_subscriber::fmt().with_env_filter(level).try_init();
}

fn run_mle() -> anyhow::Result<()> {
    eprintln!("== MLE: fit a normal to synthetic draws ==");
    let mut model = Model::new(Arc::new(Normal));
    model.set_settings(SettingsGroup::Mle(MleSettings { tolerance: 1e-10, ..Default::default() }));

    let mut data = Dataset::new("samples");
    data.vector = Some(vec![4.8, 5.1, 5.3, 4.9, 5.0, 5.2, 4.7, 5.05, 4.95, 5.15]);
    model.prep(&data)?;

    let fit = mle::estimate(&model, &data, None)?;
    let params = fit.parameters.vector.as_ref().expect("fitted params");
    eprintln!("  mu = {:.4}, sigma = {:.4}", params[0], params[1]);
    if let Some(info) = fit.info.vector.as_ref() {
        eprintln!("  log-likelihood = {:.4}, aic = {:.4}, bic = {:.4}", info[0], info[1], info[2]);
    }
    Ok(())
}

fn run_mcmc() -> anyhow::Result<()> {
    eprintln!("== MCMC: draw from a fitted normal ==");
    let mut model = Model::new(Arc::new(Normal));
    let data = Dataset::new("empty");
    model.prep(&data)?;
    model.parameters.vector = Some(vec![5.0, 0.2]);

    let draws = mcmc::draw(&model, &data, None)?;
    eprintln!("  accept rate = {:.3} over {} proposals", draws.accept_rate(), draws.proposed);
    if let Some(sample) = draws.samples.vector.as_ref() {
        eprintln!("  {} retained draws, first = {:.4}", sample.len(), sample.first().copied().unwrap_or(f64::NAN));
    }
    Ok(())
}

fn run_update() -> anyhow::Result<()> {
    eprintln!("== Bayesian update: beta prior, bernoulli trials ==");
    let mut prior = Model::new(Arc::new(Beta));
    prior.parameters.vector = Some(vec![2.0, 2.0]);

    let likelihood = Model::new(Arc::new(Bernoulli));
    let mut data = Dataset::new("trials");
    data.vector = Some(vec![1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0]);

    match update::update(&prior, &likelihood, &data, None)? {
        update::Posterior::Conjugate(post) => {
            let p = post.parameters.vector.as_ref().expect("posterior params");
            eprintln!("  posterior Beta(alpha={:.2}, beta={:.2})", p[0], p[1]);
        }
        update::Posterior::Mcmc(draws) => {
            eprintln!("  fell back to MCMC, accept rate = {:.3}", draws.accept_rate());
        }
    }
    Ok(())
}

fn run_rake() -> anyhow::Result<()> {
    eprintln!("== Raking a 2x2 table to known row/column margins ==");
    let cells: [[f64; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let observed = [10.0, 20.0, 30.0, 40.0];
    let table = rake::RakeTable::build(
        vec![vec![0.0, 1.0], vec![0.0, 1.0]],
        |v| {
            let i = cells.iter().position(|c| c == v).expect("known cell");
            observed[i]
        },
        |_: &[f64]| false,
        1e-6,
    );
    let contrasts = vec![
        rake::Contrast { dims: vec![0], targets: vec![35.0, 65.0] },
        rake::Contrast { dims: vec![1], targets: vec![45.0, 55.0] },
    ];

    let report = rake::rake(table, &contrasts, &Default::default())?;
    eprintln!(
        "  converged in {} iterations, max margin error = {:.2e}",
        report.iterations, report.max_margin_error
    );
    for (values, weight) in report.table.iter() {
        eprintln!("  cell {values:?}: {weight:.4}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args: Vec<String> = env::args().collect();

    let run_all = !["--mle", "--mcmc", "--update", "--rake"].iter().any(|f| parse_flag(&args, f));

    if run_all || parse_flag(&args, "--mle") {
        run_mle()?;
    }
    if run_all || parse_flag(&args, "--mcmc") {
        run_mcmc()?;
    }
    if run_all || parse_flag(&args, "--update") {
        run_update()?;
    }
    if run_all || parse_flag(&args, "--rake") {
        run_rake()?;
    }
    Ok(())
}
