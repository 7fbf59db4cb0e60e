//! Runs the Graph of the Gods example against the graph in the given properties file

use graphapp::GodsApp;

fn main() -> anyhow::Result<()> {
    graphapp_cli::run(GodsApp::new())
}
