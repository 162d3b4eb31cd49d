use strum::EnumString;

#[derive(Default, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

// 環境変数 ENV の値で動作環境を切り替える。
// 未設定・不正な値の場合は開発環境とみなす。
pub fn which() -> Environment {
    #[cfg(debug_assertions)]
    let default_env = "development";
    #[cfg(not(debug_assertions))]
    let default_env = "production";

    match std::env::var("ENV") {
        Err(_) => default_env.parse().unwrap_or_default(),
        Ok(v) => v.parse().unwrap_or_default(),
    }
}
