use crate::model::id::BookId;
use derive_new::new;

#[derive(new)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub quantity: i32,
}

#[derive(Debug)]
pub struct UpdateBook {
    pub book_id: BookId,
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
}

// 蔵書の完全削除。参照している貸出・読書ステータスを
// 先に削除してから蔵書本体を削除する
#[derive(Debug, new)]
pub struct DeleteBook {
    pub book_id: BookId,
}
