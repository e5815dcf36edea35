use assert_cmd::Command;
use assert_fs::prelude::*;
use clap::Parser;
use postguard::cli::{Cli, Commands, DupesCommand, KeywordsCommand};
use predicates::prelude::*;

mod util;

fn postguard(dir: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("postguard").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .arg("--no-color");
    cmd
}

#[test]
fn check_flags_parsing()
{
    let cli = Cli::parse_from([
        "postguard",
        "dupes",
        "check",
        "dog toys",
        "Dog Toys",
        "--content-file",
        "draft.md",
        "--threshold",
        "0.6",
        "--json",
        "-vv",
    ]);

    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Dupes(DupesCommand::Check(args)) => {
            assert_eq!(args.keyword, "dog toys");
            assert_eq!(args.threshold, Some(0.6));
            assert!(args.json);
            assert!(args.content.is_none());
            let p = args.content_file.expect("flag should be captured");
            assert!(p.to_string_lossy().ends_with("draft.md"));
        }
        _ => panic!("expected dupes check"),
    }
}

#[test]
fn global_flags_after_subcommand()
{
    let cli = Cli::parse_from(["postguard", "keywords", "suggest", "-n", "2", "--quiet", "--dry-run"]);
    let ctx = cli.context();
    assert!(ctx.quiet);
    assert!(ctx.dry_run);
    match cli.command {
        Commands::Keywords(KeywordsCommand::Suggest(args)) => assert_eq!(args.count, 2),
        _ => panic!("expected keywords suggest"),
    }
}

#[test]
fn inline_content_conflicts_with_file()
{
    let res = Cli::try_parse_from([
        "postguard",
        "dupes",
        "check",
        "k",
        "T",
        "body",
        "--content-file",
        "x.md",
    ]);
    assert!(res.is_err());
}

#[test]
fn next_picks_highest_score()
{
    let tmp = util::make_blog();

    let out = postguard(&tmp)
        .args(["keywords", "next", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    // medium 2 + 2.5 volume + 2 recency beats high 3 + 1.2 + 2
    assert_eq!(v["keyword"], "cat litter");
    assert_eq!(v["priority"], "medium");
    assert_eq!(v["estimated_volume"], 2500);
}

#[test]
fn next_skips_exhausted_keyword()
{
    let tmp = util::make_blog();
    util::write_tracker(&tmp, "cat litter", 3);

    let out = postguard(&tmp)
        .args(["keywords", "next", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["keyword"], "dog chew toys");
}

#[test]
fn stats_counts_keywords()
{
    let tmp = util::make_blog();
    util::write_tracker(&tmp, "cat litter", 3);

    let out = postguard(&tmp)
        .args(["keywords", "stats", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["total_keywords"], 4);
    assert_eq!(v["publishable_keywords"], 1);
    assert_eq!(v["overused_keywords"], 1);
    assert_eq!(v["usage_by_priority"]["medium"], 3);
}

#[test]
fn suggest_lists_unpublished()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args(["keywords", "suggest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. puppy training treats"))
        .stdout(predicate::str::contains("2. bird cages"));
}

#[test]
fn reset_unknown_keyword_is_flagged()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args(["keywords", "reset", "hamster wheels"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not tracked"));
}

#[test]
fn reset_clears_usage()
{
    let tmp = util::make_blog();
    util::write_tracker(&tmp, "cat litter", 3);

    postguard(&tmp)
        .args(["keywords", "reset", "cat litter"])
        .assert()
        .success();

    let raw = std::fs::read_to_string(tmp.path().join("data/content_tracker.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["keywords"]["cat litter"]["usage_count"], 0);
    // Post records survive a reset
    assert_eq!(v["posts"].as_object().unwrap().len(), 3);
}

#[test]
fn duplicate_title_exits_flagged()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args([
            "dupes",
            "check",
            "dog chew toys",
            "Dog Chew Toys — SmartPetBuys",
            "A short fresh body about something else entirely.",
        ])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("DUPLICATE"))
        .stdout(predicate::str::contains("Title duplicate"));
}

#[test]
fn copied_body_is_flagged_as_json()
{
    let tmp = util::make_blog();
    tmp.child("draft.md").write_str(util::DOG_BODY).unwrap();

    let out = postguard(&tmp)
        .args([
            "dupes",
            "check",
            "rubber dog toys",
            "Rubber Toys For Chewers",
            "--content-file",
            "draft.md",
            "--json",
        ])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["is_duplicate"], true);
    let reasons = v["reasons"].as_array().unwrap();
    assert!(reasons.iter().any(|r| r.as_str().unwrap().starts_with("Content duplicate")));
}

#[test]
fn unique_candidate_passes()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args(["dupes", "check", "cat litter", "Cat Litter", util::CAT_BODY])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn dupes_stats_json()
{
    let tmp = util::make_blog();
    util::write_post(&tmp, "dog-chew-toys-copy", "Chew Toys Again", util::DOG_BODY);
    util::write_post(&tmp, "cat-litter", "Cat Litter Guide", util::CAT_BODY);

    let out = postguard(&tmp)
        .args(["dupes", "stats", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["total_posts"], 3);
    assert_eq!(v["unique_hashes"], 2);
    assert_eq!(v["duplicate_hashes"], 1);
}

#[test]
fn cleanup_lists_without_yes()
{
    let tmp = util::make_blog();
    util::write_post(&tmp, "zz-copy", "Chew Toys Again", util::DOG_BODY);

    postguard(&tmp)
        .args(["dupes", "cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove"));

    tmp.child("content/posts/zz-copy/index.md")
        .assert(predicate::path::exists());
}

#[test]
fn init_writes_config_once()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    tmp.child("postguard.toml")
        .assert(predicate::str::contains("usage_cap = 3"));

    postguard(&tmp)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn config_file_overrides_defaults()
{
    let tmp = util::make_blog();
    util::write_tracker(&tmp, "cat litter", 1);
    tmp.child("postguard.toml")
        .write_str("[guard]\nusage_cap = 1\n")
        .unwrap();

    let out = postguard(&tmp)
        .args(["keywords", "next", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["keyword"], "dog chew toys");
}

#[test]
fn missing_explicit_config_fails()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args(["--config", "nope.toml", "keywords", "stats"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn generate_dry_run_writes_nothing()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args(["generate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"))
        .stdout(predicate::str::contains("cat litter"));

    tmp.child("data/content_tracker.json")
        .assert(predicate::path::missing());
}

#[test]
fn generate_without_api_key_fails()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .arg("generate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn misuse_exits_two()
{
    let tmp = util::make_blog();

    postguard(&tmp)
        .args(["dupes", "check"])
        .assert()
        .code(2);
}

#[test]
fn completions_to_stdout()
{
    let tmp = assert_fs::TempDir::new().unwrap();

    postguard(&tmp)
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("postguard"));
}

#[test]
fn full_length_article_on_new_topic_passes()
{
    let tmp = util::make_blog();
    util::write_post(
        &tmp,
        "dog-chew-toys-guide",
        "Dog Chew Toys Guide — SmartPetBuys",
        include_str!("fixtures/dog_chew_toys.md"),
    );
    tmp.child("draft.md")
        .write_str(include_str!("fixtures/cat_litter.md"))
        .unwrap();

    postguard(&tmp)
        .args([
            "dupes",
            "check",
            "cat litter",
            "Cat Litter — SmartPetBuys",
            "--content-file",
            "draft.md",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("no duplicates"));
}
