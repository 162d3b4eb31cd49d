use kernel::model::{book::Book, id::BookId};

#[derive(sqlx::FromRow)]
pub struct BookRow {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub quantity: i32,
}

impl From<BookRow> for Book {
    fn from(value: BookRow) -> Self {
        let BookRow {
            book_id,
            title,
            author,
            genre,
            description,
            quantity,
        } = value;
        Book {
            book_id,
            title,
            author,
            genre,
            description,
            quantity,
        }
    }
}
