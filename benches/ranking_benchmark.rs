use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skillswap_match_engine::{
    core::{ProficiencyLevel, ProfileSnapshot, SkillClaim},
    ranking::{score_match, OverlapRanker, Ranker},
};

const SKILLS: [&str; 6] = ["Python", "Rust", "Guitar", "Spanish", "Excel", "Figma"];

fn create_test_candidates(count: usize) -> Vec<ProfileSnapshot> {
    (0..count)
        .map(|i| {
            ProfileSnapshot::new(i.to_string())
                .with_location(if i % 3 == 0 { "Paris, FR" } else { "Lyon, FR" })
                .with_availability(["weekends", "evenings"])
                .with_claim(SkillClaim::offered(SKILLS[i % 6], ProficiencyLevel::Expert))
                .with_claim(SkillClaim::wanted(SKILLS[(i + 1) % 6], ProficiencyLevel::Intermediate))
        })
        .collect()
}

fn current_user() -> ProfileSnapshot {
    ProfileSnapshot::new("me")
        .with_location("Paris, France")
        .with_availability(["weekends", "mornings"])
        .with_claim(SkillClaim::offered("Python", ProficiencyLevel::Advanced))
        .with_claim(SkillClaim::offered("Spanish", ProficiencyLevel::Beginner))
        .with_claim(SkillClaim::wanted("Guitar", ProficiencyLevel::Beginner))
}

fn bench_score_match(c: &mut Criterion) {
    let current = current_user();
    let other = create_test_candidates(3).remove(2);

    c.bench_function("score_match_pair", |b| {
        b.iter(|| black_box(score_match(&current, &other)));
    });
}

fn bench_overlap_ranking(c: &mut Criterion) {
    let ranker = OverlapRanker::new();
    let current = current_user();

    let candidates_10 = create_test_candidates(10);
    let candidates_100 = create_test_candidates(100);
    let candidates_1000 = create_test_candidates(1000);

    c.bench_function("overlap_rank_10", |b| {
        b.iter(|| black_box(ranker.rank(&current, &candidates_10)));
    });

    c.bench_function("overlap_rank_100", |b| {
        b.iter(|| black_box(ranker.rank(&current, &candidates_100)));
    });

    c.bench_function("overlap_rank_1000", |b| {
        b.iter(|| black_box(ranker.rank(&current, &candidates_1000)));
    });
}

criterion_group!(benches, bench_score_match, bench_overlap_ranking);
criterion_main!(benches);
