use chrono::{DateTime, TimeDelta, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use streetpulse::{
    agg::aggregate, Database, MemorySource, NewReading, NewSensor, Reading, ReadingSource,
    SensorType,
};

fn readings(n: usize, start: DateTime<Utc>) -> Vec<Reading> {
    (0..n)
        .map(|idx| {
            let sensor_type = SensorType::ALL[idx % SensorType::ALL.len()];
            Reading::new(
                format!("{sensor_type}-{}", idx % 20),
                sensor_type,
                (idx % 100) as f64,
                start + TimeDelta::seconds(idx as i64 * 13),
            )
        })
        .collect()
}

fn truncate(c: &mut Criterion) {
    let ts = streetpulse::now();

    c.bench_function("truncate", |b| {
        b.iter(|| streetpulse::truncate(&ts));
    });
}

fn aggregate_readings(c: &mut Criterion) {
    let start = streetpulse::now() - TimeDelta::days(7);

    for n in [1_000, 100_000] {
        let readings = readings(n, start);

        c.bench_function(&format!("aggregate ({n} readings)"), |b| {
            b.iter(|| aggregate(&readings).unwrap());
        });
    }
}

fn memory_query(c: &mut Criterion) {
    let now = streetpulse::now();
    let source = MemorySource::new(readings(100_000, now - TimeDelta::days(14)));

    c.bench_function("timeseries (memory, 7d)", |b| {
        b.iter(|| source.timeseries().range("7d").now(now).collect().unwrap());
    });
}

fn write_reading(c: &mut Criterion) {
    c.bench_function("write single", |b| {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir).unwrap();

        let sensor = db
            .create_sensor(NewSensor::new("bench", SensorType::Traffic, 0.0, 0.0))
            .unwrap();

        let mut ts = streetpulse::now();

        b.iter(|| {
            db.write(NewReading::new(&sensor.id, 52.74, ts)).unwrap();
            ts += TimeDelta::microseconds(1);
        });
    });
}

fn db_query(c: &mut Criterion) {
    c.bench_function("timeseries (db, 24h)", |b| {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir).unwrap();
        let now = streetpulse::now();

        for sensor_type in SensorType::ALL {
            let sensor = db
                .create_sensor(NewSensor::new("bench", sensor_type, 0.0, 0.0))
                .unwrap();

            for minute in 0..(24 * 60) {
                db.write(NewReading::new(
                    &sensor.id,
                    f64::from(minute),
                    now - TimeDelta::minutes(minute.into()),
                ))
                .unwrap();
            }
        }

        b.iter(|| db.timeseries().range("24h").now(now).collect().unwrap());
    });
}

criterion_group!(
    benches,
    truncate,
    aggregate_readings,
    memory_query,
    write_reading,
    db_query,
);
criterion_main!(benches);
