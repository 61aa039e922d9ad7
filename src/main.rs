// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod cli;

use anyhow::Error;
use cli::Options;
use config::Config;
use controller::{Controller, DataStats, Dataset, FileController, ToTable};
use engine::{eval, Model, Recommender};
use log::LevelFilter;
use rand::{rngs::StdRng, SeedableRng};
use simplelog::{TermLogger, TerminalMode};
use std::time::Instant;

fn load_config(options: &Options) -> Result<Config, Error> {
    let mut config = match &options.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(seed) = options.random_seed {
        config.general.random_seed = Some(seed);
    }

    if let Some(k) = options.k {
        config.knn.k = k.limit();
    }

    config.validate()?;
    Ok(config)
}

fn print_stats(dataset: &Dataset) {
    println!("training data");
    println!("{}", DataStats::of(&dataset.training).to_table());
    println!("test data");
    println!("{}", DataStats::of(&dataset.test).to_table());

    if let Some(attributes) = &dataset.user_attributes {
        println!("{} user attributes", attributes.number_of_columns());
    }

    if let Some(attributes) = &dataset.item_attributes {
        println!("{} item attributes", attributes.number_of_columns());
    }

    if let Some(relation) = &dataset.user_relation {
        println!("{} user relations", relation.number_of_entries());
    }
}

fn evaluate(model: &Model, options: &Options, dataset: &Dataset) {
    let start = Instant::now();

    let result = eval::items::evaluate(
        model.as_recommender(),
        &dataset.test.user_items(),
        &dataset.training.user_items(),
        &dataset.relevant_items(),
    );

    println!("{}", result.to_table());

    if options.method.predicts_ratings() {
        let accuracy = eval::ratings::evaluate(model.as_recommender(), &dataset.test);
        println!("{}", accuracy.to_table());
    }

    log::info!("testing time {:.3}s", start.elapsed().as_secs_f64());
}

fn main() -> Result<(), Error> {
    let matches = cli::app().get_matches();
    let options = Options::from_matches(&matches)?;

    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(level, simplelog::Config::default(), TerminalMode::Mixed)?;

    let config = load_config(&options)?;

    let mut rng = match config.general.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let delimiter = config.data.delimiter_byte()?;
    let dataset = FileController::new(options.files.clone(), delimiter).load()?;

    print_stats(&dataset);

    let mut model = options
        .method
        .build(&config, &dataset)?
        .with_fit_logging(options.compute_fit);

    println!("{}", model);

    let start = Instant::now();
    model.train(&mut rng)?;
    log::info!("training time {:.3}s", start.elapsed().as_secs_f64());

    if let Some(fit) = model.compute_fit() {
        log::info!("fit {:.5}", fit);
    }

    if !options.no_eval {
        evaluate(&model, &options, &dataset);
    }

    Ok(())
}
