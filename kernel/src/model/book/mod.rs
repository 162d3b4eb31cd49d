use crate::model::id::BookId;

pub mod event;

#[derive(Debug)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    // 蔵書の総数。貸出可能数は quantity - 未返却の貸出数 として
    // 貸出作成時に計算され、蔵書側には保持しない
    pub quantity: i32,
}

// 貸出情報に含める蔵書の情報
#[derive(Debug)]
pub struct LoanBook {
    pub book_id: BookId,
    pub title: String,
}
