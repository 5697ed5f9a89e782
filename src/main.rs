mod app;
mod audio;
mod catalog;
mod config;
mod library;
mod mpris;
mod player;
mod runtime;
mod ui;

fn main() -> anyhow::Result<()> {
    runtime::run()
}
