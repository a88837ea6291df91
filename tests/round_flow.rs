/// End-to-end "Spell it!" rounds over the sled store: start gate, play, settle.
mod common;

use common::{day, fail_current, spell_current};
use quinncash::app::App;
use quinncash::config::Config;
use quinncash::family::{settings, words};
use quinncash::spell::{Bank, RoundProgress, SpellError, WORDS_PER_ROUND};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn open_app() -> (TempDir, App) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_string_lossy().into_owned();
    let app = App::open(config).unwrap();
    (dir, app)
}

#[test]
fn perfect_round_pays_five() {
    let (_dir, app) = open_app();
    let mut rng = StdRng::seed_from_u64(42);
    let mut started = app.start_spelling_on(day(3), false, &mut rng).unwrap();
    assert_eq!(started.cap.earned, 0);
    let round = &mut started.round;
    assert_eq!(round.len(), WORDS_PER_ROUND);

    let mut settlement = None;
    for i in 0..WORDS_PER_ROUND {
        match spell_current(round) {
            RoundProgress::NextWord(result) => {
                assert!(result.correct);
                assert!(i + 1 < WORDS_PER_ROUND);
            }
            RoundProgress::Finished(s) => settlement = Some(s),
            RoundProgress::Playing => panic!("word {} did not finish", i),
        }
    }
    let mut settlement = settlement.expect("round finished");
    assert_eq!(settlement.earned(), 5);

    let report = settlement.settle(app.store(), "quinn", day(3)).unwrap().unwrap();
    assert_eq!(report.balance, Some(5));
    assert_eq!(app.store().earnings_for("quinn", day(3)).unwrap(), 5);

    assert!(matches!(
        app.start_spelling_on(day(3), false, &mut rng),
        Err(SpellError::DailyCapReached { earned: 5, cap: 5 })
    ));
    assert!(app.start_spelling_on(day(4), false, &mut rng).is_ok());
}

#[test]
fn mixed_round_pays_for_correct_words_only() {
    let (_dir, app) = open_app();
    let mut rng = StdRng::seed_from_u64(7);
    let mut round = app.start_spelling_on(day(5), false, &mut rng).unwrap().round;

    let mut last = RoundProgress::Playing;
    for i in 0..WORDS_PER_ROUND {
        last = if i % 2 == 0 {
            spell_current(&mut round)
        } else {
            fail_current(&mut round)
        };
    }
    let RoundProgress::Finished(mut settlement) = last else {
        panic!("round should be finished");
    };
    let correct: Vec<bool> = settlement.outcome().results().iter().map(|r| r.correct).collect();
    assert_eq!(correct, vec![true, false, true, false, true]);

    settlement.settle(app.store(), "quinn", day(5)).unwrap();
    assert_eq!(app.store().balance("quinn").unwrap(), 3);
    let log = app.store().list_transactions("quinn", 5).unwrap();
    assert_eq!(log[0].note, "Spell it! - 3/5 words correct");
}

#[test]
fn all_failed_round_leaves_balance_alone() {
    let (_dir, app) = open_app();
    let mut rng = StdRng::seed_from_u64(1);
    let mut round = app.start_spelling_on(day(6), false, &mut rng).unwrap().round;
    let mut last = RoundProgress::Playing;
    for _ in 0..WORDS_PER_ROUND {
        last = fail_current(&mut round);
    }
    let RoundProgress::Finished(mut settlement) = last else {
        panic!("round should be finished");
    };
    let report = settlement.settle(app.store(), "quinn", day(6)).unwrap().unwrap();
    assert_eq!(report.earned, 0);
    assert_eq!(app.store().balance("quinn").unwrap(), 0);
    assert!(app.store().get_earnings("quinn", day(6)).unwrap().is_none());
    assert!(app.store().list_transactions("quinn", 5).unwrap().is_empty());
}

#[test]
fn bonus_round_bypasses_cap_and_ledger() {
    let (_dir, app) = open_app();
    settings::update_settings(app.store(), None, Some(2)).unwrap();
    app.store().upsert_earnings("quinn", day(7), 2).unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    assert!(matches!(
        app.start_spelling_on(day(7), false, &mut rng),
        Err(SpellError::DailyCapReached { earned: 2, cap: 2 })
    ));

    settings::launch_bonus(app.store()).unwrap();
    let mut round = app.start_spelling_on(day(7), false, &mut rng).unwrap().round;
    assert!(round.is_bonus());
    let mut last = RoundProgress::Playing;
    for i in 0..WORDS_PER_ROUND {
        last = if i < 3 {
            spell_current(&mut round)
        } else {
            fail_current(&mut round)
        };
    }
    let RoundProgress::Finished(mut settlement) = last else {
        panic!("round should be finished");
    };
    let report = settlement.settle(app.store(), "quinn", day(7)).unwrap().unwrap();
    assert_eq!(report.earned, 3);
    assert_eq!(app.store().balance("quinn").unwrap(), 3);
    assert_eq!(app.store().earnings_for("quinn", day(7)).unwrap(), 2);
}

#[test]
fn small_vocabulary_gives_short_round_and_inactive_words_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_string_lossy().into_owned();
    config.game.seed_starter_words = false;
    let app = App::open(config).unwrap();

    let cat = words::add_word(app.store(), "cat", "🐱").unwrap();
    words::add_word(app.store(), "dog", "🐶").unwrap();
    words::toggle_word(app.store(), &cat.id).unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let round = app.start_spelling_on(day(8), false, &mut rng).unwrap().round;
    assert_eq!(round.len(), 1);
    assert_eq!(round.words()[0].word, "dog");

    words::toggle_word(app.store(), &round.words()[0].id).unwrap();
    assert!(matches!(
        app.start_spelling_on(day(8), false, &mut rng),
        Err(SpellError::EmptyVocabulary)
    ));
}

#[test]
fn threshold_from_settings_applies_to_every_word() {
    let (_dir, app) = open_app();
    settings::update_settings(app.store(), Some(3), None).unwrap();
    let mut rng = StdRng::seed_from_u64(12);
    let mut round = app.start_spelling_on(day(9), false, &mut rng).unwrap().round;
    assert_eq!(round.settings().incorrect_threshold, 3);
    assert!(matches!(fail_current(&mut round), RoundProgress::NextWord(r) if !r.correct));
    assert_eq!(round.current().threshold(), 3);
}
