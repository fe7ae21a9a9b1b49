use clap::Parser;
use num_complex::Complex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_nnqs::{
    read_run_config, Adam, Rbm, SamplingPlan, SrRunner, SwapSweeper, Xxz,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,
}

fn main() {
    env_logger::init();

    // read the config file, with command line argument, use clap mod to input the file name
    let args = Args::parse();
    let conf = read_run_config(&args.config);

    let n = conf.n;
    let m = conf.alpha * n;
    let mut rng = StdRng::seed_from_u64(conf.seed);
    let mut qs = Rbm::<Complex<f64>>::new(n, m, conf.use_bias);
    qs.initialize_random(&mut rng, conf.init_std);
    let dim = qs.dim();

    // Marshall sign rule rotation keeps the off-diagonal matrix elements
    // negative, which improves the sampled energy estimator.
    let ham = Xxz::new(n, 1.0, conf.delta, true);

    log::info!(
        "XXZ chain: n = {}, m = {}, delta = {}, dim = {}",
        n,
        m,
        conf.delta,
        dim
    );

    let mut runner = SrRunner::new()
        .with_lambda(conf.lambda_initial, conf.lambda_decay, conf.lambda_min)
        .with_max_iter(conf.max_iter)
        .with_cg(conf.use_cg, conf.cg_tol, conf.cg_max_iter);
    if conf.save_per > 0 {
        runner = runner.with_checkpoints(conf.save_per, "checkpoints".into());
    }

    let plan = SamplingPlan {
        n_chains: conf.n_chains,
        n_sweeps: conf.n_sweeps.unwrap_or(2 * dim),
        n_therm: conf.n_therm.unwrap_or(dim * 2 / 5),
        // SwapSweeper conserves magnetization; sample in the Jz = 0 sector
        n_up: Some(n / 2),
        seed: conf.seed,
    };

    let mut opt = Adam::default();

    println!("#iter\tenergy\tupdate_norm");
    runner.run_sampled(&mut qs, &ham, &SwapSweeper, plan, &mut opt, |stats| {
        if let Some(err) = &stats.error {
            log::warn!("iteration {} skipped: {}", stats.iteration, err);
        }
        log::debug!(
            "iteration {}: sampling {} ms, solve {} ms",
            stats.iteration,
            stats.sample_ms,
            stats.solve_ms
        );
        println!(
            "{}\t{:.8}\t{:.6e}",
            stats.iteration, stats.energy, stats.update_norm
        );
    });
}
