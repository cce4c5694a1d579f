use std::{fs, os::unix::fs::PermissionsExt, path::PathBuf};

use clap::Parser;

use super::Fixture;

/// Run plinkqc-rs against a copy of `tests/test-data/sample`, using the PLINK stand-in of `tests/test-data/bin`.
pub struct PlinkqcRunner {
    data : Fixture,
    plink: Fixture,
    args : Vec<String>,
}

impl PlinkqcRunner {
    pub fn new() -> Self {
        let data  = Fixture::copy("sample");
        let plink = Fixture::copy("bin/plink");
        fs::set_permissions(&*plink, fs::Permissions::from_mode(0o755)).expect("Failed to set PLINK permissions");
        Self{data, plink, args: Vec::new()}
    }

    /// Prefix of the sample text fileset.
    pub fn prefix(&self) -> String {
        format!("{}/sample", self.data)
    }

    pub fn output(&self, suffix: &str) -> PathBuf {
        self.data.join(format!("sample{suffix}"))
    }

    pub fn data_file(&self, filename: &str) -> PathBuf {
        self.data.join(filename)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append whitespace separated arguments.
    pub fn args_str(mut self, args: &str) -> Self {
        self.args.extend(args.split_whitespace().map(String::from));
        self
    }

    /// Make the PLINK stand-in fail on every invocation holding `arg`.
    pub fn fail_on(self, arg: &str) -> Self {
        fs::write(self.plink.with_file_name("fail-on"), arg).expect("Failed to write fail-on file");
        self
    }

    /// Full command line of the `run` subcommand.
    pub fn command_line(&self) -> Vec<String> {
        let mut args: Vec<String> = ["plinkqc-rs", "run", "--prefix", self.prefix().as_str(), "--plink", self.plink.to_string().as_str()]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.args.iter().cloned());
        args
    }

    pub fn cli(&self) -> parser::Cli {
        parser::Cli::try_parse_from(self.command_line()).expect("Invalid command line")
    }

    pub fn run(&self) -> anyhow::Result<()> {
        plinkqc_rs::run(self.cli())
    }

    /// Arguments of every PLINK invocation, in order of execution.
    pub fn calls(&self) -> Vec<String> {
        match fs::read_to_string(self.plink.with_file_name("calls.log")) {
            Ok(log) => log.lines().map(String::from).collect(),
            Err(_)  => Vec::new(),
        }
    }
}
