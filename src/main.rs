mod app;
mod archive;
mod bundle;
mod cli;
mod config;
mod fetch;
mod install;
mod paths;
mod profiles;
mod relocate;
#[cfg(test)]
mod test_support;
mod ui;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
