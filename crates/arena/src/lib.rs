//! 行指向テキストプロトコルで対話する2エンジン間の対局管理
//!
//! - [`referee`]: 1局の進行（プロトコル、持ち時間、勝敗判定）
//! - [`tournament`] / [`rating`]: 連続対局と Elo 集計
//! - [`search`]: ビルド → トーナメントを繰り返すパラメータ山登り

pub mod error;
pub mod rating;
pub mod records;
pub mod referee;
pub mod report;
pub mod search;
pub mod tournament;
