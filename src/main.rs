use std::io::IsTerminal;

use burn::backend::NdArray;
use clap::Parser;
use dotenv::dotenv;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hallucinice::config::{Cli, RunConfig};
use hallucinice::env::HallucinationEnv;
use hallucinice::rl::{
    CallbackList, DqnDriver, FileLogger, LinearAnnealedPolicy, ModelIntervalCheckpoint,
};
use hallucinice::sc2::{LocalMinigame, LocalMinigameConfig};

type Backend = NdArray;

/// Installs the fmt subscriber; `RUST_LOG` overrides `default_directives`
fn init_logging(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn training_game(config: &RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Map {}, algorithm {}, seed {}, screen {}x{}",
        config.map_name,
        config.algorithm,
        config.seed,
        config.dimensions.screen,
        config.dimensions.screen
    );

    let game = LocalMinigame::new(
        &config.map_name,
        LocalMinigameConfig {
            dimensions: config.dimensions,
            game_steps_per_episode: config.game_steps_per_episode,
            ..LocalMinigameConfig::default()
        },
        config.seed,
    )?;
    let mut env = HallucinationEnv::new(
        game,
        config.env,
        StdRng::seed_from_u64(config.seed.wrapping_add(1)),
    );

    let device = Default::default();
    let perception = config.perception();
    tracing::info!(
        "Perception network: {} filters, {} dense inputs, {} actions",
        perception.filters,
        perception.flatten_size(),
        env.nb_actions()
    );
    let mut network = perception.init::<Backend>(&device);
    if let Some(path) = &config.load_weights {
        network = network.load_weights(&path.to_string_lossy(), &device)?;
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let policy = LinearAnnealedPolicy::new(
        config.schedule.annealing,
        StdRng::seed_from_u64(config.seed.wrapping_add(2)),
    );
    let mut driver = DqnDriver::new(network, policy, device);
    let mut callbacks: CallbackList<Backend> = CallbackList::new(vec![
        Box::new(ModelIntervalCheckpoint::new(
            config.checkpoint_template(),
            config.schedule.checkpoint_interval,
        )),
        Box::new(FileLogger::new(
            config.log_path(),
            config.schedule.file_log_interval,
        )),
    ]);

    let schedule = &config.schedule;
    driver.fit(
        &mut env,
        &mut callbacks,
        schedule.nb_steps,
        schedule.action_repetition,
        schedule.log_interval,
    )?;
    driver
        .network()
        .save_weights(&config.weights_path().to_string_lossy())?;

    let results = driver.test(&mut env, schedule.test_episodes, schedule.action_repetition)?;
    if !results.is_empty() {
        let mean = results.iter().map(|r| r.simulator_reward).sum::<f32>() / results.len() as f32;
        tracing::info!(
            "Test over {} episodes: mean simulator reward {:.2}",
            results.len(),
            mean
        );
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging("hallucinice=debug,info");

    let cli = Cli::parse();
    let config = RunConfig::from_cli(&cli)?;
    training_game(&config)
}
