use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use yearbook::models::{BadgeAward, BadgeSummary, ProfileListing, Rarity};
use yearbook::provider::ProfileFilter;
use yearbook::services::placeholder_profiles;
use yearbook::validation::sanitize_html;

/// A directory page worth of rows, built from the sample profiles.
fn page_of_rows(count: usize) -> Vec<ProfileListing> {
    let samples = placeholder_profiles();
    (0..count)
        .map(|i| {
            let mut row = samples[i % samples.len()].clone();
            row.profile.username = Some(format!("member_{i}"));
            if i % 4 == 0 {
                row.awards.push(BadgeAward {
                    badge: Some(BadgeSummary::new("OG", "👑", Rarity::Legendary)),
                });
            }
            row
        })
        .collect()
}

fn benchmark_filter(c: &mut Criterion) {
    let rows = page_of_rows(1000);
    let search = ProfileFilter {
        search: Some("whale".to_string()),
        badge: None,
    };
    let combined = ProfileFilter {
        search: Some("defi".to_string()),
        badge: Some("OG".to_string()),
    };

    let mut group = c.benchmark_group("directory_filter");

    group.bench_function("search_only", |b| {
        b.iter(|| rows.iter().filter(|row| black_box(&search).matches(row)).count())
    });

    group.bench_function("search_and_badge", |b| {
        b.iter(|| rows.iter().filter(|row| black_box(&combined).matches(row)).count())
    });

    group.finish();
}

fn benchmark_sanitize(c: &mut Criterion) {
    let plain = "Diamond hands since 2010 💎🙌 ".repeat(20);
    let hostile = r#"<p onclick="steal()">gm <b>frens</b></p><script>alert(1)</script><a href="javascript:x">link</a>"#
        .repeat(10);

    let mut group = c.benchmark_group("sanitize_html");

    group.bench_function("plain_bio", |b| b.iter(|| sanitize_html(black_box(&plain))));

    group.bench_function("hostile_bio", |b| {
        b.iter(|| sanitize_html(black_box(&hostile)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_filter, benchmark_sanitize);
criterion_main!(benches);
