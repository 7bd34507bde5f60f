use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pin_engine::{apply_insert, assemble, resolve_success, Item, Payload};

fn listing(size: usize) -> Vec<Item> {
    (0..size)
        .map(|i| {
            let id = format!("c{}", i);
            if i % 4 == 0 {
                Item::new(id.as_str(), Payload::text("root"))
            } else {
                let parent = format!("c{}", (i - 1).saturating_sub(i % 3));
                Item::reply(id.as_str(), parent.as_str(), Payload::text("reply"))
            }
        })
        .collect()
}

fn assemble_thread(c: &mut Criterion) {
    let items = listing(1_000);

    c.bench_function("assemble_1000_comments", |b| {
        b.iter(|| assemble(black_box(items.clone())))
    });
}

fn insert_and_confirm(c: &mut Criterion) {
    let forest = assemble(listing(1_000));

    c.bench_function("insert_reply_and_confirm", |b| {
        b.iter(|| {
            let (optimistic, op) =
                apply_insert(black_box(&forest), Some(&"c998".into()), Payload::text("hi"))
                    .unwrap();
            resolve_success(&optimistic, &op, Item::reply("srv", "c998", Payload::text("hi")))
                .unwrap()
        })
    });
}

criterion_group!(benches, assemble_thread, insert_and_confirm);
criterion_main!(benches);
