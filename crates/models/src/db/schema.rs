table! {
    book_owners (book, user) {
        book -> Integer,
        user -> Integer,
        status -> crate::db::types::Member_status,
    }
}

table! {
    books (id) {
        id -> Integer,
        title -> Text,
        description -> Nullable<Text>,
        cover -> Nullable<Text>,
        wallpaper -> Nullable<Text>,
        status -> crate::db::types::Book_status,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    categories (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    categories_on_books (book, category) {
        book -> Integer,
        category -> Integer,
    }
}

table! {
    chapter_market_history (chapter, user) {
        chapter -> Integer,
        user -> Integer,
        price -> BigInt,
        created_at -> Timestamp,
    }
}

table! {
    chapters (id) {
        id -> Integer,
        book -> Nullable<Integer>,
        author -> Integer,
        title -> Text,
        content -> Text,
        published_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        price -> BigInt,
    }
}

table! {
    follows (follower, followee) {
        follower -> Integer,
        followee -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Integer,
        penname -> Text,
        name -> Text,
        coin -> BigInt,
        created_at -> Timestamp,
    }
}

joinable!(book_owners -> books (book));
joinable!(book_owners -> users (user));
joinable!(categories_on_books -> books (book));
joinable!(categories_on_books -> categories (category));
joinable!(chapter_market_history -> chapters (chapter));
joinable!(chapter_market_history -> users (user));
joinable!(chapters -> users (author));

allow_tables_to_appear_in_same_query!(
    book_owners,
    books,
    categories,
    categories_on_books,
    chapter_market_history,
    chapters,
    follows,
    users,
);
