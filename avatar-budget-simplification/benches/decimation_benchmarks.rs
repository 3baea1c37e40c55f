//! Benchmarks for polygon mesh decimation

use avatar_budget_core::{MeshData, Point3f, Polygon};
use avatar_budget_simplification::Decimator;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_quad_grid(size: usize) -> MeshData {
    let mut positions = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            positions.push(Point3f::new(x as f32, y as f32, fx.sin() * fy.sin() * 2.0));
        }
    }
    let mut polygons = Vec::with_capacity((size - 1) * (size - 1));
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let bl = tl + size;
            polygons.push(Polygon::quad(tl, bl, bl + 1, tl + 1));
        }
    }
    MeshData::new(positions, polygons).expect("grid indices are in range")
}

fn bench_decimation(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let ratios = [0.3, 0.5, 0.7];

    let mut group = c.benchmark_group("decimation");

    for &size in &sizes {
        let mesh = generate_quad_grid(size);
        let triangles = mesh.triangle_count();

        for &ratio in &ratios {
            for preserve_uvs in [true, false] {
                let name = if preserve_uvs { "triangulated" } else { "keep_polygons" };
                group.bench_with_input(
                    BenchmarkId::new(name, format!("{}t_r{}", triangles, (ratio * 100.0) as u32)),
                    &(&mesh, ratio),
                    |b, &(mesh, ratio)| {
                        let decimator = Decimator::new(preserve_uvs);
                        b.iter(|| {
                            let result = decimator.decimate(black_box(mesh), ratio).unwrap();
                            black_box(result);
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_decimation);
criterion_main!(benches);
