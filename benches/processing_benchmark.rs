use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use openaq_pipeline::models::NormalizedRecord;
use openaq_pipeline::processors::{DataMerger, RecordNormalizer};

const PARAMETERS: [&str; 4] = ["pm25", "pm10", "no2", "o3"];

// One raw JSONL line per sensor per day
fn create_raw_lines(sensor_count: usize, days: usize) -> Vec<String> {
    let base = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    let mut lines = Vec::with_capacity(sensor_count * days);

    for sensor_id in 1..=sensor_count {
        let tag = PARAMETERS[sensor_id % PARAMETERS.len()];
        for day in 0..days {
            let from = base + Duration::days(day as i64);
            let to = from + Duration::days(1);
            lines.push(format!(
                r#"{{"value": {v}, "parameter": {{"id": 2, "name": "{tag}", "units": "µg/m³"}}, "period": {{"label": "1 day", "interval": "24:00:00", "datetimeFrom": {{"utc": "{from}", "local": "{from}"}}, "datetimeTo": {{"utc": "{to}", "local": "{to}"}}}}, "summary": {{"min": 1.0, "avg": {v}, "max": 30.0}}, "sensor_id": {sensor_id}, "sensor_name": "Site {loc}", "location_id": {loc}, "state": "ME"}}"#,
                v = 5.0 + (day as f64) * 0.25 + sensor_id as f64,
                tag = tag,
                from = from.to_rfc3339(),
                to = to.to_rfc3339(),
                sensor_id = sensor_id,
                loc = sensor_id / 3 + 1,
            ));
        }
    }

    lines
}

fn create_records(sensor_count: usize, days: usize, offset: f64) -> Vec<NormalizedRecord> {
    let base = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    let mut records = Vec::with_capacity(sensor_count * days);

    for sensor_id in 1..=sensor_count as u64 {
        for day in 0..days {
            let from = base + Duration::days(day as i64);
            records.push(NormalizedRecord::new(
                sensor_id,
                Some(format!("Site {}", sensor_id / 3 + 1)),
                Some(sensor_id / 3 + 1),
                Some("ME".to_string()),
                PARAMETERS[sensor_id as usize % PARAMETERS.len()].to_string(),
                offset + day as f64,
                from,
                Some(from + Duration::days(1)),
            ));
        }
    }

    records
}

fn benchmark_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalizer");
    let normalizer = RecordNormalizer::new();

    for sensor_count in [10, 100, 500].iter() {
        let lines = create_raw_lines(*sensor_count, 30);

        group.bench_with_input(
            BenchmarkId::new("normalize_lines", sensor_count),
            &lines,
            |b, lines| {
                b.iter(|| {
                    for line in lines {
                        black_box(normalizer.normalize_line(black_box(line)));
                    }
                });
            },
        );
    }

    group.finish();
}

fn benchmark_data_merger(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_merger");
    let merger = DataMerger::new();

    for sensor_count in [10, 100, 500].iter() {
        let existing = create_records(*sensor_count, 30, 0.0);
        // Half the fresh batch overlaps the existing window
        let fresh: Vec<_> = create_records(*sensor_count, 45, 100.0)
            .into_iter()
            .filter(|r| r.datetime_from >= existing[15].datetime_from)
            .collect();

        group.bench_with_input(
            BenchmarkId::new("merge", sensor_count),
            &(existing, fresh),
            |b, (existing, fresh)| {
                b.iter(|| black_box(merger.merge(existing.clone(), fresh.clone())));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_normalizer, benchmark_data_merger);
criterion_main!(benches);
