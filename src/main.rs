/*!
 * Fast Dump - Demo Entry Point
 *
 * Drives the pipeline with synthetic frames from several producer threads:
 * - Host-memory resource backend
 * - Directory sink (FAST_DUMP_OUTPUT_DIR, default ./dumps)
 * - Configuration from FAST_DUMP_* environment variables
 */

use anyhow::Context;
use fast_dump::core::limits::{DEFAULT_OUTPUT_DIR, ENV_OUTPUT_DIR};
use fast_dump::{
    init_tracing, DirectorySink, DumpConfig, FastDump, HostBackend, PixelFormat, ResourceKind,
    ResourceShapeKey, StaticBudget,
};
use std::sync::Arc;
use std::thread;
use tracing::info;

const PRODUCERS: u32 = 4;
const FRAMES_PER_PRODUCER: u32 = 16;
const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 64;

/// Simulated platform memory: 64MB shared, 256MB local
const SHARED_MEMORY: usize = 64 * 1024 * 1024;
const LOCAL_MEMORY: usize = 256 * 1024 * 1024;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = DumpConfig::from_env().context("loading FAST_DUMP_* configuration")?;
    let output_dir =
        std::env::var(ENV_OUTPUT_DIR).unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string());
    info!(output_dir = %output_dir, ?config, "Fast dump demo starting");

    let backend = Arc::new(HostBackend::new());
    let dump = Arc::new(
        FastDump::builder()
            .with_backend(backend.clone())
            .with_budget(Arc::new(StaticBudget::new(SHARED_MEMORY, LOCAL_MEMORY)))
            .with_sink(Arc::new(DirectorySink::new(&output_dir)))
            .with_config(config)
            .build()
            .context("building fast dump pipeline")?,
    );

    let shape = ResourceShapeKey::new(
        ResourceKind::Surface2D,
        FRAME_WIDTH,
        FRAME_HEIGHT,
        PixelFormat(0),
    );
    let frame_len = (FRAME_WIDTH * FRAME_HEIGHT * 4) as usize;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let backend = backend.clone();
            let dump = dump.clone();
            thread::Builder::new()
                .name(format!("producer-{}", producer))
                .spawn(move || {
                    // One render target per producer, overwritten every frame
                    let target = backend.create_resource(shape, vec![0; frame_len]);
                    for frame in 0..FRAMES_PER_PRODUCER {
                        let fill = (producer * FRAMES_PER_PRODUCER + frame) as u8;
                        if backend.write(target, &vec![fill; frame_len]).is_err() {
                            break;
                        }
                        dump.submit(target, &format!("p{}_frame{:03}.rgba", producer, frame), 0, 0);
                    }
                    backend.destroy(target);
                })
        })
        .collect::<Result<_, _>>()
        .context("spawning producer threads")?;

    for producer in producers {
        if producer.join().is_err() {
            anyhow::bail!("producer thread panicked");
        }
    }

    let dump = Arc::try_unwrap(dump)
        .map_err(|_| anyhow::anyhow!("pipeline still shared after producers finished"))?;
    let stats = dump.shutdown();

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
