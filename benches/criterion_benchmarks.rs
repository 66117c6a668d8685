use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::Path;
use textrle::codec::{decoder, encoder};

const TILES: [char; 6] = ['#', '$', '.', ' ', '@', '*'];

fn gen_text(size: usize, seed: u64) -> String {
    let mut s = seed;
    let mut out = String::with_capacity(size);
    while out.len() < size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let tile = TILES[(s >> 33) as usize % TILES.len()];
        let run = 1 + (s >> 40) as usize % 6;
        out.extend(std::iter::repeat_n(tile, run.min(size - out.len())));
    }
    out
}

/// Level-like text: one row pattern repeated, which multi-pass can factor.
fn gen_rows(size: usize) -> String {
    let row = "#   $   ..   #|";
    row.chars().cycle().take(size).collect()
}

fn write_ratio_snapshot() {
    let mut csv = String::from("workload,plain_chars,single_chars,multi_chars\n");
    for (name, text) in [("random", gen_text(2048, 3)), ("rows", gen_rows(2048))] {
        let single = encoder::compress(&text);
        let multi = encoder::multi_pass_compress(&text);
        csv.push_str(&format!(
            "{name},{},{},{}\n",
            text.chars().count(),
            single.chars().count(),
            multi.chars().count()
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_single_pass(c: &mut Criterion) {
    let mut g = c.benchmark_group("single_pass_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let text = gen_text(size, 1);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(encoder::compress(black_box(&text))));
        });
    }
    g.finish();
}

fn bench_multi_pass(c: &mut Criterion) {
    let mut g = c.benchmark_group("multi_pass_vs_size");
    for size in [256usize, 1024, 4096] {
        let text = gen_rows(size);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(encoder::multi_pass_compress(black_box(&text))));
        });
    }
    g.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut g = c.benchmark_group("decompress_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let text = gen_text(size, 2);
        let packed = encoder::compress(&text);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(decoder::decompress(black_box(&packed)).unwrap()));
        });
    }
    g.finish();
}

fn bench_nested_expansion(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("nested_expansion");
    for depth in [1usize, 4, 16] {
        // Each level doubles the output; the innermost group holds 8 chars.
        let packed = format!("{}(#$.@ *_+){}", "2(".repeat(depth), ")".repeat(depth));
        g.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(decoder::decompress(black_box(&packed)).unwrap()));
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_single_pass,
    bench_multi_pass,
    bench_decompress,
    bench_nested_expansion
);
criterion_main!(benches);
