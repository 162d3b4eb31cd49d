use derive_new::new;
use garde::Validate;
use kernel::model::{
    book::{
        event::{CreateBook, UpdateBook},
        Book,
    },
    id::BookId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[garde(length(min = 1))]
    pub title: String,
    #[garde(length(min = 1))]
    pub author: String,
    #[garde(length(min = 1))]
    pub genre: String,
    #[garde(skip)]
    pub description: String,
    #[garde(range(min = 1))]
    pub quantity: i32,
}

impl From<CreateBookRequest> for CreateBook {
    fn from(value: CreateBookRequest) -> Self {
        let CreateBookRequest {
            title,
            author,
            genre,
            description,
            quantity,
        } = value;
        CreateBook {
            title,
            author,
            genre,
            description,
            quantity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[garde(inner(length(min = 1)))]
    pub title: Option<String>,
    #[garde(inner(length(min = 1)))]
    pub author: Option<String>,
    #[garde(inner(length(min = 1)))]
    pub genre: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(inner(range(min = 1)))]
    pub quantity: Option<i32>,
}

#[derive(new)]
pub struct UpdateBookRequestWithId(BookId, UpdateBookRequest);

impl From<UpdateBookRequestWithId> for UpdateBook {
    fn from(value: UpdateBookRequestWithId) -> Self {
        let UpdateBookRequestWithId(
            book_id,
            UpdateBookRequest {
                title,
                author,
                genre,
                description,
                quantity,
            },
        ) = value;
        UpdateBook {
            book_id,
            title,
            author,
            genre,
            description,
            quantity,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksResponse {
    pub items: Vec<BookResponse>,
}

impl From<Vec<Book>> for BooksResponse {
    fn from(value: Vec<Book>) -> Self {
        Self {
            items: value.into_iter().map(BookResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub quantity: i32,
}

impl From<Book> for BookResponse {
    fn from(value: Book) -> Self {
        let Book {
            book_id,
            title,
            author,
            genre,
            description,
            quantity,
        } = value;
        Self {
            book_id,
            title,
            author,
            genre,
            description,
            quantity,
        }
    }
}
