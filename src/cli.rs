// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use anyhow::Error;
use clap::{App, Arg, ArgMatches};
use controller::DataFiles;
use engine::{knn::NeighborCount, Method};
use std::path::{Path, PathBuf};

pub fn app() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Trains a recommender on a training file and evaluates it on a test file")
        .arg(
            Arg::with_name("TRAIN")
                .help("Training ratings, `user item [rating [timestamp]]` per line")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("TEST")
                .help("Test ratings, same format as the training file")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("METHOD")
                .help("Recommender to train")
                .required(true)
                .possible_values(&Method::NAMES)
                .case_insensitive(true)
                .index(3),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .value_name("FILE")
                .help("TOML configuration, defaults are used for missing values"),
        )
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory every data file is relative to"),
        )
        .arg(
            Arg::with_name("user-attributes")
                .long("user-attributes")
                .value_name("FILE")
                .help("Binary user attributes, `user attribute` per line"),
        )
        .arg(
            Arg::with_name("item-attributes")
                .long("item-attributes")
                .value_name("FILE")
                .help("Binary item attributes, `item attribute` per line"),
        )
        .arg(
            Arg::with_name("user-relation")
                .long("user-relation")
                .value_name("FILE")
                .help("Social network, `user user` per line"),
        )
        .arg(
            Arg::with_name("relevant-items")
                .long("relevant-items")
                .value_name("FILE")
                .help("Items taking part in the evaluation, one per line"),
        )
        .arg(
            Arg::with_name("random-seed")
                .long("random-seed")
                .value_name("N")
                .help("Seed for every random choice, overrides the configuration"),
        )
        .arg(
            Arg::with_name("k")
                .long("k")
                .value_name("K")
                .help("Number of neighbors for kNN methods, a positive integer or 'inf'"),
        )
        .arg(
            Arg::with_name("no-eval")
                .long("no-eval")
                .help("Only train the model"),
        )
        .arg(
            Arg::with_name("compute-fit")
                .long("compute-fit")
                .help("Log the fit of the attribute mapping while it learns"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every iteration"),
        )
}

/// Validated command line options
#[derive(Debug)]
pub struct Options {
    pub files: DataFiles,
    pub method: Method,
    pub config: Option<PathBuf>,
    pub random_seed: Option<u64>,
    pub k: Option<NeighborCount>,
    pub no_eval: bool,
    pub compute_fit: bool,
    pub verbose: bool,
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, Error> {
        let data_dir = matches.value_of("data-dir").map(Path::new);
        let path = |name: &str| {
            matches.value_of(name).map(|file| match data_dir {
                Some(dir) => dir.join(file),
                None => PathBuf::from(file),
            })
        };

        let files = DataFiles {
            training: path("TRAIN").unwrap_or_default(),
            test: path("TEST").unwrap_or_default(),
            user_attributes: path("user-attributes"),
            item_attributes: path("item-attributes"),
            user_relation: path("user-relation"),
            relevant_items: path("relevant-items"),
        };

        let method = matches.value_of("METHOD").unwrap_or_default().parse()?;

        let random_seed = match matches.value_of("random-seed") {
            Some(seed) => Some(seed.parse()?),
            None => None,
        };

        let k = match matches.value_of("k") {
            Some(k) => Some(k.parse()?),
            None => None,
        };

        Ok(Self {
            files,
            method,
            config: matches.value_of("config").map(PathBuf::from),
            random_seed,
            k,
            no_eval: matches.is_present("no-eval"),
            compute_fit: matches.is_present("compute-fit"),
            verbose: matches.is_present("verbose"),
        })
    }
}
