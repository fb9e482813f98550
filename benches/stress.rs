use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ulid::Ulid;

use courtside::config::Config;
use courtside::model::*;
use courtside::{Engine, InMemoryStore};

type BenchEngine = Engine<Arc<InMemoryStore>>;

/// 2021-01-01T00:00:00Z. Every generated slot is an hour offset from here.
const BASE: Ms = 1_609_459_200_000;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn slot(i: i64, locations: Locations) -> NewReservation {
    let start = BASE + i * HOUR_MS;
    NewReservation {
        name: format!("Slot {i}"),
        span: Span::new(start, start + HOUR_MS),
        locations,
    }
}

fn engine(config: &Config) -> BenchEngine {
    let store = InMemoryStore::from_config(config).expect("open store");
    // Clock pinned before every generated slot.
    Engine::new(Arc::new(store)).with_clock(|| BASE)
}

async fn phase1_sequential(engine: &BenchEngine) {
    let customer = Customer::customer(Ulid::new());
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        engine
            .create_reservation(slot(i as i64, Locations::BADMINTON), &customer)
            .await
            .expect("slot free");
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} reservations in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create latency", &mut latencies);
}

async fn phase2_concurrent(engine: Arc<BenchEngine>) {
    let n_tasks = 10;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();

    for task in 0..n_tasks {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let customer = Customer::customer(Ulid::new());
            // Disjoint hour ranges per task, past the sequential phase.
            let base = 100_000 + task as i64 * 10_000;
            for j in 0..n_per_task {
                engine
                    .create_reservation(slot(base + j as i64, Locations::TABLE_TENNIS), &customer)
                    .await
                    .expect("slot free");
            }
        }));
    }
    for h in handles {
        h.await.expect("writer task");
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} reservations = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_availability_under_load(engine: Arc<BenchEngine>) {
    let stop = Arc::new(AtomicBool::new(false));

    let mut writer_handles = Vec::new();
    for w in 0..4 {
        let engine = engine.clone();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let customer = Customer::customer(Ulid::new());
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let _ = engine
                    .create_reservation(slot(1_000_000 + w * 100_000 + i, Locations::BOTH), &customer)
                    .await;
                i += 1;
                tokio::task::yield_now().await;
            }
        }));
    }

    let n_readers = 8;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();
    for r in 0..n_readers {
        let engine = engine.clone();
        reader_handles.push(tokio::spawn(async move {
            // A week of hourly proposals over densely booked time.
            let proposals: Vec<TimeProposal> = (0..168)
                .map(|h| {
                    let start = BASE + (r * 168 + h) * HOUR_MS;
                    TimeProposal::new(Span::new(start, start + HOUR_MS), Locations::BOTH)
                })
                .collect();
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for _ in 0..reads_per_reader {
                let t = Instant::now();
                engine.check_availability(&proposals).await.expect("availability");
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.expect("reader task"));
    }
    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("availability batch (168 proposals)", &mut all_latencies);
}

async fn phase4_series(engine: &BenchEngine) {
    let customer = Customer::customer(Ulid::new());
    let n = 50;
    let mut latencies = Vec::with_capacity(n);
    let mut created = 0;

    for i in 0..n {
        // Weekly through 2021 after phase 1's hours, one distinct hour per series.
        let start = BASE + (2_100 + i as i64) * HOUR_MS;
        let query = RecurringQuery::new(
            Span::new(start, start + HOUR_MS),
            Locations::BADMINTON,
            Recurrence::Weekly,
            TimePeriod::CurrentYear,
        );
        let t = Instant::now();
        let result = engine
            .create_recurring_reservation(NewRecurringReservation { name: format!("Series {i}"), query }, &customer)
            .await;
        latencies.push(t.elapsed());
        if let Ok(series) = result {
            created += series.count;
        }
    }

    println!("  {n} series attempted, {created} reservations written");
    print_latency("series create latency", &mut latencies);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).init();

    let mut config = Config::from_env();
    courtside::observability::init_from_config(&config).expect("metrics exporter");
    let temp_dir = config.data_dir.is_none().then(|| {
        let dir = std::env::temp_dir().join(format!("courtside_bench_{}", Ulid::new()));
        config.data_dir = Some(dir.clone());
        dir
    });

    println!("=== courtside stress benchmark ===");
    println!("data dir: {}\n", config.data_dir.as_ref().map_or("-".into(), |d| d.display().to_string()));

    let engine = Arc::new(engine(&config));

    println!("[phase 1] sequential create throughput");
    phase1_sequential(&engine).await;

    println!("\n[phase 2] concurrent create throughput");
    phase2_concurrent(engine.clone()).await;

    println!("\n[phase 3] availability latency under write load");
    phase3_availability_under_load(engine.clone()).await;

    println!("\n[phase 4] recurring series creation");
    phase4_series(&engine).await;

    println!("\n  {} reservations stored", engine.store().reservation_count().await);

    if let Some(dir) = temp_dir {
        let _ = std::fs::remove_dir_all(dir);
    }
}
