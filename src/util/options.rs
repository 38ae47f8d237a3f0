// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

const REPTA_USAGE: &str = r#"repta [OPTIONS]"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    // We could put this into lazy_static! with a Mutex around, but we really do not expect
    // to construct this more then once per regular program run.
    let parser = Command::new("repta")
        .no_binary_name(true)
        .override_usage(REPTA_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("testcase")
            .long("testcase")
            .takes_value(true)
            .value_parser([
                "running-example",
                "list-last",
                "list-linear",
                "list-cyclic",
                "variable",
                "field",
                "parameters",
            ])
            .default_value("running-example")
            .help("The built-in testcase program to analyze."))
        .arg(Arg::new("entry-func-name")
            .long("entry-func")
            .takes_value(true)
            .help("The name of entry method from which the analysis begins.")
            .long_help("Overrides the testcase's default entry method. The method is looked \
                        up by name in the testcase's main class."))
        .arg(Arg::new("max-iterations")
            .long("max-iterations")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .default_value("40")
            .help("The iteration limit for the interprocedural fixed point."))
        .arg(Arg::new("show-table")
            .long("show-table")
            .takes_value(false)
            .help("Print the converged method summary table."));
    parser
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub testcase: String,
    pub entry_func: Option<String>,
    pub max_iterations: u32,
    pub show_table: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            testcase: "running-example".to_string(),
            entry_func: None,
            max_iterations: 40,
            show_table: false,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings, exiting with diagnostics on
    /// invalid arguments.
    pub fn parse_from_args(&mut self, args: &[String]) {
        let matches = match make_options_parser().try_get_matches_from(args.iter()) {
            Ok(matches) => matches,
            Err(e) => {
                e.exit();
            }
        };

        if let Some(s) = matches.get_one::<String>("testcase") {
            self.testcase = s.clone();
        }
        self.entry_func = matches.get_one::<String>("entry-func-name").cloned();
        if let Some(limit) = matches.get_one::<u32>("max-iterations") {
            self.max_iterations = *limit;
        }
        self.show_table = matches.contains_id("show-table");
    }
}
