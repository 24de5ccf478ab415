use criterion::{Criterion, black_box, criterion_group, criterion_main};
use querylens::analyze::analyze_repo;
use querylens::scan::ScanOptions;
use std::path::PathBuf;

fn setup_test_repo() -> PathBuf {
    let repo_root = std::env::temp_dir().join(format!(
        "querylens-bench-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(repo_root.join("src")).unwrap();
    std::fs::write(repo_root.join("package.json"), r#"{"name": "bench"}"#).unwrap();
    std::fs::write(
        repo_root.join("src/keys.ts"),
        r#"
export const todoKeys = {
    all: ["todos"],
    lists: () => [...todoKeys.all, "list"],
    detail: (id) => [...todoKeys.all, "detail", id],
};
"#,
    )
    .unwrap();
    for i in 0..50 {
        std::fs::write(
            repo_root.join(format!("src/feature_{i}.ts")),
            r#"
import { useQuery, useQueryClient } from "@tanstack/react-query";
import { todoKeys } from "./keys";

export function useTodoDetail(id) {
    return useQuery({ queryKey: todoKeys.detail(id) });
}

export function useTodoList() {
    return useQuery({ queryKey: todoKeys.lists() });
}

export function useRefresh() {
    const client = useQueryClient();
    return () => client.invalidateQueries({ queryKey: todoKeys.all });
}
"#,
        )
        .unwrap();
    }
    repo_root
}

fn bench_analyze(c: &mut Criterion) {
    let repo_root = setup_test_repo();
    c.bench_function("analyze_repo_50_files", |b| {
        b.iter(|| {
            let result = analyze_repo(black_box(&repo_root), ScanOptions::default()).unwrap();
            black_box(result.graph.summary.edges)
        })
    });
    let _ = std::fs::remove_dir_all(&repo_root);
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
