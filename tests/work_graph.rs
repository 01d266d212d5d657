mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use courseload::model::{CourseStatus, Timeslot, UserPool};
use courseload::scenario::{Benchmark, LoadContext, install};
use courseload::score::ScoreTag;
use courseload::{Config, Supervisor, SupervisorBuilder};

use common::{FakeConnector, FakeTarget, fast_config, student};

fn setup(cfg: Config, target: &Arc<FakeTarget>) -> (Arc<Supervisor>, Arc<LoadContext>) {
    let sup = SupervisorBuilder::new(cfg.clone()).build();
    let users = UserPool::new(Arc::new(FakeConnector(Arc::clone(target))), 3).unwrap();
    let ctx = Arc::new(LoadContext::new(
        cfg,
        users,
        sup.bus().clone(),
        sup.token().clone(),
    ));
    install(&sup, &ctx);
    (sup, ctx)
}

fn counter<T>(topic: &courseload::Topic<T>) -> Arc<AtomicUsize> {
    let n = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&n);
    topic.subscribe("count", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    n
}

async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(10), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closed_course_feeds_a_new_course_and_student() {
    let target = FakeTarget::new();
    let cfg = Config {
        seat_cap: 2,
        classes_per_course: 1,
        read_announcement_wait: Duration::from_millis(50),
        course_full_wait: Duration::from_secs(30),
        load_window: Duration::from_secs(30),
        ..fast_config()
    };
    let (sup, ctx) = setup(cfg, &target);
    let courses_seen = counter(&ctx.topics.courses);
    let students_seen = counter(&ctx.topics.students);

    ctx.begin_load();
    let token = sup.token().clone();
    let course = ctx
        .add_course(&token, Timeslot::new(2, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(courses_seen.load(Ordering::SeqCst), 1);

    let mut handles = Vec::new();
    for i in 0..2 {
        let ctx = Arc::clone(&ctx);
        let s = student(&target, &format!("X{i:05}"));
        handles.push(tokio::spawn(async move {
            let batch = ctx.matcher.reserve(&s, 1).unwrap();
            assert_eq!(batch.len(), 1);
            batch.commit().unwrap();
            s
        }));
    }
    let mut registered = Vec::new();
    for h in handles {
        registered.push(h.await.unwrap());
    }

    eventually("course closure", || course.status() == CourseStatus::Closed).await;
    eventually("downstream load", || {
        courses_seen.load(Ordering::SeqCst) == 2 && students_seen.load(Ordering::SeqCst) == 1
    })
    .await;

    assert_eq!(ctx.registry.count(), 2);
    assert_eq!(ctx.active_students(), 1);
    assert_eq!(ctx.board.count(ScoreTag::SubmitAssignment), 2);
    for s in &registered {
        assert!(s.timetable().is_empty());
        assert_eq!(s.results().len(), 1);
        assert!(s.enrollments().is_empty());
    }

    sup.shutdown("test over").await.unwrap();
    ctx.topics.close();
    assert_eq!(sup.running(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_export_is_retried_and_counted() {
    let target = FakeTarget::new();
    target.time_out_exports(2);
    let cfg = Config {
        seat_cap: 1,
        classes_per_course: 1,
        read_announcement_wait: Duration::from_millis(50),
        course_full_wait: Duration::from_secs(30),
        load_window: Duration::from_secs(30),
        ..fast_config()
    };
    let (sup, ctx) = setup(cfg, &target);
    let courses_seen = counter(&ctx.topics.courses);
    let students_seen = counter(&ctx.topics.students);

    ctx.begin_load();
    let token = sup.token().clone();
    let course = ctx
        .add_course(&token, Timeslot::new(1, 1).unwrap())
        .await
        .unwrap();
    let s = student(&target, "X00001");
    ctx.matcher.reserve(&s, 1).unwrap().commit().unwrap();

    eventually("course closure", || course.status() == CourseStatus::Closed).await;
    eventually("downstream load", || {
        courses_seen.load(Ordering::SeqCst) == 2 && students_seen.load(Ordering::SeqCst) == 1
    })
    .await;

    let errors = ctx.board.errors();
    assert_eq!(errors.timeout, 2);
    assert_eq!(errors.deduction, 0);
    assert_eq!(errors.critical, 0);
    assert_eq!(ctx.board.count(ScoreTag::RegisterScores), 1);
    assert_eq!(s.results().len(), 1);
    assert!(s.timetable().is_empty());

    sup.shutdown("test over").await.unwrap();
    ctx.topics.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_mid_run_stops_every_worker() {
    let target = FakeTarget::new().with_latency(Duration::from_millis(5));
    let cfg = Config {
        load_window: Duration::from_secs(30),
        grace: Duration::from_secs(3),
        ..fast_config()
    };
    let (sup, ctx) = setup(cfg, &target);

    ctx.begin_load();
    ctx.initial_load(sup.token()).await;
    assert!(sup.running() > 0);
    tokio::time::sleep(Duration::from_millis(300)).await;

    sup.token().cancel();
    sup.shutdown("cancelled").await.unwrap();
    ctx.topics.close();

    assert_eq!(sup.running(), 0);
    for course in ctx.registry.snapshot_for_validation().values() {
        assert_eq!(course.snapshot().reservations, 0, "course {}", course.id);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn benchmark_against_a_healthy_target_passes() {
    let target = FakeTarget::new();
    let cfg = Config {
        initial_students: 10,
        load_window: Duration::from_millis(1500),
        ..fast_config()
    };

    let result = Benchmark::new(cfg, Arc::new(FakeConnector(Arc::clone(&target))))
        .with_subscribers(Vec::new())
        .run()
        .await
        .unwrap();

    assert!(result.finished);
    assert_eq!(result.errors.critical, 0, "{}", result.reason);
    assert!(result.passed, "{}", result.reason);
    assert!(result.active_students >= 10);
    assert!(result.breakdown.get(ScoreTag::RegisterCourses) > 0);
    assert!(result.score > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_load_stops_after_prepare() {
    let target = FakeTarget::new();
    let cfg = Config {
        no_load: true,
        ..fast_config()
    };

    let result = Benchmark::new(cfg, Arc::new(FakeConnector(Arc::clone(&target))))
        .with_subscribers(Vec::new())
        .run()
        .await
        .unwrap();

    assert!(result.passed);
    assert_eq!(result.reason, "load skipped");
    assert_eq!(result.active_students, 0);
    // teacher login plus the course list probe
    assert_eq!(target.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_registrations_fail_the_run() {
    let target = FakeTarget::new();
    target.fail_registrations(500);
    let cfg = Config {
        initial_students: 10,
        error_fail_threshold: 3,
        load_window: Duration::from_secs(5),
        ..fast_config()
    };

    let result = Benchmark::new(cfg, Arc::new(FakeConnector(Arc::clone(&target))))
        .with_subscribers(Vec::new())
        .run()
        .await
        .unwrap();

    assert!(!result.passed);
    assert_eq!(result.breakdown.get(ScoreTag::RegisterCourses), 0);
    assert!(result.errors.deduction >= 4, "{:?}", result.errors);
}
