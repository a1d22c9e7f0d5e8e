//! Background music routing demo.
//!
//! Runs the audio engine on its own thread and drives the demo scene from
//! single-key commands typed on stdin.

fn main() -> anyhow::Result<()> {
    bgm_demo::run()
}
