//! Runs the random following network example against the graph in the given properties file

use graphapp::FollowApp;

fn main() -> anyhow::Result<()> {
    graphapp_cli::run(FollowApp::new())
}
