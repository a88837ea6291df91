/// Async configuration loading through tokio::fs.
use quinncash::config::Config;

#[tokio::test]
async fn default_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let config = Config::load(path).await.unwrap();
    assert_eq!(config.family.child_name, "Quinn");
    assert_eq!(config.family.user_id, "quinn");
    assert!(config.game.seed_starter_words);
}

#[tokio::test]
async fn missing_file_is_an_error_naming_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("nope.toml"));
}

#[tokio::test]
async fn blank_user_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    tokio::fs::write(&path, "[family]\nchild_name = \"Q\"\nuser_id = \" \"\n")
        .await
        .unwrap();
    assert!(Config::load(path.to_str().unwrap()).await.is_err());
}

#[test]
fn security_section_feeds_argon2() {
    let config: Config = toml::from_str(
        "[security.argon2]\nmemory_kib = 2048\ntime_cost = 2\nparallelism = 1\n",
    )
    .unwrap();
    let argon = config.security.argon2();
    assert_eq!(argon.params().m_cost(), 2048);
    assert_eq!(argon.params().t_cost(), 2);
}

#[test]
fn load_can_be_driven_from_sync_code() {
    let result = tokio_test::block_on(Config::load("/definitely/not/here.toml"));
    assert!(result.is_err());
}
