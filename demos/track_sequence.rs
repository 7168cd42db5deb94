use anyhow::Result;
use motion_tracker::database::ObjectDatabase;
use motion_tracker::detectors::background::BackgroundSubtractionDetector;
use motion_tracker::examples::save_ball_sequence;
use motion_tracker::pipeline::consumer::{Consumer, ConsumerOptions};
use motion_tracker::pipeline::source::{FrameSource, FrameSourceOptions};
use motion_tracker::trackers::ema::EmaTracker;
use motion_tracker::Errors;
use std::time::Duration;

/// Usage: `track_sequence [SOURCE] [FPS]`
///
/// SOURCE is an image sequence pattern (`frames/img-%04d.png`), a directory or a file.
/// Without it, the bouncing ball sequence is rendered into a temporary directory.
///
fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let scratch = tempfile::tempdir()?;
    let source = match args.next() {
        Some(source) => source,
        None => save_ball_sequence(scratch.path())?
            .to_string_lossy()
            .into_owned(),
    };
    let fps = args.next().map(|v| v.parse::<f64>()).transpose()?;

    let source = FrameSource::open(
        &source,
        FrameSourceOptions {
            fps,
            ..Default::default()
        },
    )?;
    let database = ObjectDatabase::new(
        Box::new(BackgroundSubtractionDetector::default()),
        Box::new(EmaTracker::default()),
    );
    let mut consumer = Consumer::new(
        source,
        database,
        ConsumerOptions {
            frame_timeout: Duration::from_secs(2),
            ..Default::default()
        },
    );

    let res = consumer.run(|snapshot| match snapshot.to_json() {
        Ok(json) => log::info!("{}", json),
        Err(e) => log::warn!("Unable to serialize the snapshot: {}", e),
    });

    match res {
        Ok(frames) => eprintln!("Stopped after {} frames", frames),
        Err(e) if matches!(e.downcast_ref::<Errors>(), Some(Errors::SourceExhausted)) => {
            eprintln!(
                "Source exhausted after {} frames",
                consumer.database().frames()
            );
        }
        Err(e) => return Err(e),
    }

    for w in consumer.database_mut().wasted() {
        eprintln!("Object {} removed: {:?}", w.object.id(), w.reason);
    }
    Ok(())
}
