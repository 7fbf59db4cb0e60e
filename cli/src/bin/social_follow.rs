//! Runs the dated social follow graph example against the graph in the given properties file

use graphapp::SocialApp;

fn main() -> anyhow::Result<()> {
    graphapp_cli::run(SocialApp::new())
}
