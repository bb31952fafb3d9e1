use clap::Parser;
use light_set::HashSet;
use light_set::ResizePolicy;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Number of integers inserted and then removed.
    #[arg(short = 'n', long = "count", default_value_t = 1000)]
    count: u64,

    #[arg(long = "initial_capacity", default_value_t = 8)]
    initial_capacity: usize,

    #[arg(long = "grow_ratio", default_value_t = 2.0)]
    grow_ratio: f64,

    #[arg(long = "shrink_ratio", default_value_t = 0.125)]
    shrink_ratio: f64,
}

fn main() -> Result<(), light_set::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("light_set=debug")),
        )
        .init();

    let args = Args::parse();
    let policy = ResizePolicy::new(args.initial_capacity, args.grow_ratio, args.shrink_ratio)?;
    let mut set: HashSet<u64> = HashSet::with_policy(policy);

    println!("Inserting 0..{} into a set of capacity {}", args.count, set.capacity());
    let mut peak = set.capacity();
    for value in 0..args.count {
        assert!(set.insert(value), "value inserted twice: {value}");
        peak = peak.max(set.capacity());
    }
    for value in 0..args.count {
        assert!(set.contains(&value), "value went missing: {value}");
    }

    info!(len = set.len(), capacity = set.capacity(), "filled");
    set.probe_histogram().print();
    set.debug_stats().print();

    println!("Removing every value...");
    for value in 0..args.count {
        assert!(set.remove(&value), "value already gone: {value}");
        for rest in (value + 1)..args.count.min(value + 8) {
            assert!(set.contains(&rest), "removal of {value} hid {rest}");
        }
    }

    info!(len = set.len(), capacity = set.capacity(), "emptied");
    set.debug_stats().print();
    println!(
        "Peak capacity: {}, final capacity: {} (initial {})",
        peak,
        set.capacity(),
        policy.initial_capacity()
    );

    Ok(())
}
