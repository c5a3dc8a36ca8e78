//! Movie catalog star schema
//!
//! `dim_movie`, `dim_genre`, `dim_user` and the shared `dim_date` are referenced by the
//! `movie_genre` bridge and the `fact_viewlog` fact.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::schema::{ColumnDef, ColumnType, ColumnValue, ForeignKey, TableDef, TableKind, TableRow};

pub const DIM_MOVIE: TableDef = TableDef {
    name: "dim_movie",
    kind: TableKind::Dimension,
    columns: &[
        ColumnDef::required("movie_id", ColumnType::Integer),
        ColumnDef::required("title", ColumnType::Text),
        ColumnDef::optional("original_title", ColumnType::Text),
        ColumnDef::optional("release_date", ColumnType::Date),
        ColumnDef::optional("overview", ColumnType::Text),
        ColumnDef::optional("popularity", ColumnType::Real),
        ColumnDef::optional("vote_average", ColumnType::Real),
        ColumnDef::optional("vote_count", ColumnType::Integer),
        ColumnDef::optional("adult", ColumnType::Boolean),
    ],
    key: &["movie_id"],
    foreign_keys: &[],
};

pub const DIM_GENRE: TableDef = TableDef {
    name: "dim_genre",
    kind: TableKind::Dimension,
    columns: &[
        ColumnDef::required("genre_id", ColumnType::Integer),
        ColumnDef::required("genre_name", ColumnType::Text),
    ],
    key: &["genre_id"],
    foreign_keys: &[],
};

pub const DIM_USER: TableDef = TableDef {
    name: "dim_user",
    kind: TableKind::Dimension,
    columns: &[
        ColumnDef::required("user_id", ColumnType::Integer),
        ColumnDef::required("username", ColumnType::Text),
        ColumnDef::optional("age_group", ColumnType::Text),
        ColumnDef::optional("region", ColumnType::Text),
    ],
    key: &["user_id"],
    foreign_keys: &[],
};

pub const MOVIE_GENRE: TableDef = TableDef {
    name: "movie_genre",
    kind: TableKind::Bridge,
    columns: &[
        ColumnDef::required("movie_id", ColumnType::Integer),
        ColumnDef::required("genre_id", ColumnType::Integer),
    ],
    key: &["movie_id", "genre_id"],
    foreign_keys: &[
        ForeignKey {
            columns: &["movie_id"],
            table: "dim_movie",
            references: &["movie_id"],
        },
        ForeignKey {
            columns: &["genre_id"],
            table: "dim_genre",
            references: &["genre_id"],
        },
    ],
};

pub const FACT_VIEWLOG: TableDef = TableDef {
    name: "fact_viewlog",
    kind: TableKind::Fact,
    columns: &[
        ColumnDef::required("movie_id", ColumnType::Integer),
        ColumnDef::required("user_id", ColumnType::Integer),
        ColumnDef::required("view_date", ColumnType::Date),
        ColumnDef::optional("rating", ColumnType::Real),
        ColumnDef::required("view_count", ColumnType::Integer),
    ],
    key: &["movie_id", "user_id", "view_date"],
    foreign_keys: &[
        ForeignKey {
            columns: &["movie_id"],
            table: "dim_movie",
            references: &["movie_id"],
        },
        ForeignKey {
            columns: &["user_id"],
            table: "dim_user",
            references: &["user_id"],
        },
        ForeignKey {
            columns: &["view_date"],
            table: "dim_date",
            references: &["date_id"],
        },
    ],
};

/// Catalog file as delivered by the upstream fetcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "id")]
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    /// Empty or malformed dates are stored as NULL
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

impl Movie {
    pub fn genre_links(&self) -> impl Iterator<Item = MovieGenre> + '_ {
        self.genre_ids.iter().map(move |&genre_id| MovieGenre {
            movie_id: self.movie_id,
            genre_id,
        })
    }
}

impl TableRow for Movie {
    const TABLE: &'static TableDef = &DIM_MOVIE;

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            self.movie_id.into(),
            self.title.as_str().into(),
            self.original_title.clone().into(),
            self.release_date.into(),
            self.overview.as_str().into(),
            self.popularity.into(),
            self.vote_average.into(),
            self.vote_count.into(),
            self.adult.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    #[serde(rename = "id")]
    pub genre_id: i64,
    pub name: String,
}

impl TableRow for Genre {
    const TABLE: &'static TableDef = &DIM_GENRE;

    fn values(&self) -> Vec<ColumnValue> {
        vec![self.genre_id.into(), self.name.as_str().into()]
    }
}

/// Sample viewer, generated by the catalog load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub age_group: String,
    pub region: String,
}

impl TableRow for User {
    const TABLE: &'static TableDef = &DIM_USER;

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            self.user_id.into(),
            self.username.as_str().into(),
            self.age_group.as_str().into(),
            self.region.as_str().into(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MovieGenre {
    pub movie_id: i64,
    pub genre_id: i64,
}

impl TableRow for MovieGenre {
    const TABLE: &'static TableDef = &MOVIE_GENRE;

    fn values(&self) -> Vec<ColumnValue> {
        vec![self.movie_id.into(), self.genre_id.into()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewLog {
    pub movie_id: i64,
    pub user_id: i64,
    pub view_date: NaiveDate,
    pub rating: f64,
    pub view_count: i64,
}

impl TableRow for ViewLog {
    const TABLE: &'static TableDef = &FACT_VIEWLOG;

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            self.movie_id.into(),
            self.user_id.into(),
            self.view_date.into(),
            self.rating.into(),
            self.view_count.into(),
        ]
    }
}
