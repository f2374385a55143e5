use chrono::TimeDelta;
use rand::Rng;
use std::path::Path;
use std::time::Instant;
use streetpulse::{Database, NewReading, NewSensor, SensorType, TimeRange, Value};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const SENSORS_PER_TYPE: usize = 5;

fn main() -> streetpulse::Result<()> {
    env_logger::builder()
        .filter_module("lsm_tree", log::LevelFilter::Warn)
        .filter_module("fjall", log::LevelFilter::Info)
        .filter_module("streetpulse", log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let range = TimeRange::lenient(&args.next().unwrap_or_default());
    let types = streetpulse::parse_sensor_types(&args.next().unwrap_or_default())?;

    let path = Path::new(".streetpulse");

    if path.try_exists()? {
        std::fs::remove_dir_all(path)?;
    }

    let db = Database::new(path)?;
    let now = streetpulse::now();

    let start = Instant::now();

    {
        let mut rng = rand::thread_rng();

        for sensor_type in SensorType::ALL {
            for idx in 0..SENSORS_PER_TYPE {
                let sensor = db.create_sensor(NewSensor::new(
                    format!("{sensor_type} Sensor {}", idx + 1),
                    sensor_type,
                    37.4419 + rng.gen_range(-0.01..0.01),
                    -122.1430 + rng.gen_range(-0.01..0.01),
                ))?;

                let mut ts = range.start(now);

                while ts <= now {
                    // Base value per type, with some random variation
                    let base: Value = match sensor_type {
                        SensorType::Streetlight => 25_000.0,
                        SensorType::Pedestrian => 40.0,
                        SensorType::Traffic => 80.0,
                        SensorType::Environmental => 25.0,
                    };
                    let value = (base * rng.gen_range(0.7..1.3)).max(0.0);

                    db.write(NewReading::new(&sensor.id, value, ts))?;

                    ts += TimeDelta::minutes(15);
                }
            }
        }
    }

    log::info!("ingested in {:?}", start.elapsed());

    let start = Instant::now();

    let series = db.timeseries().types(&types).time_range(range).now(now).collect()?;

    log::info!("{} rows in {:?}", series.len(), start.elapsed());

    println!("{}", serde_json::to_string_pretty(&series)?);

    log::info!("stats: {:#?}", db.stats(&types, range, now)?);

    Ok(())
}
