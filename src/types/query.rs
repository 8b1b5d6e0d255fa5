use super::Role;

/// Direction of a listing sort. Anything other than `desc` sorts ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn parse(s: Option<&str>) -> SortDir {
        match s {
            Some("desc") => SortDir::Desc,
            _ => SortDir::Asc,
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    #[default]
    Name,
    Email,
    Address,
    Role,
    CreatedAt,
}

impl UserSortField {
    /// Unknown or missing fields fall back to sorting by name.
    #[must_use]
    pub fn parse(s: Option<&str>) -> UserSortField {
        match s {
            Some("email") => UserSortField::Email,
            Some("address") => UserSortField::Address,
            Some("role") => UserSortField::Role,
            Some("createdAt") => UserSortField::CreatedAt,
            _ => UserSortField::Name,
        }
    }

    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::Address => "address",
            UserSortField::Role => "role",
            UserSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreSortField {
    #[default]
    Name,
    Email,
    Address,
    AverageRating,
    CreatedAt,
}

impl StoreSortField {
    /// Parses the sort fields available to administrators.
    #[must_use]
    pub fn parse(s: Option<&str>) -> StoreSortField {
        match s {
            Some("email") => StoreSortField::Email,
            Some("address") => StoreSortField::Address,
            Some("averageRating") => StoreSortField::AverageRating,
            Some("createdAt") => StoreSortField::CreatedAt,
            _ => StoreSortField::Name,
        }
    }

    /// Parses the narrower set of sort fields offered when browsing stores.
    #[must_use]
    pub fn parse_browse(s: Option<&str>) -> StoreSortField {
        match s {
            Some("address") => StoreSortField::Address,
            Some("averageRating") => StoreSortField::AverageRating,
            _ => StoreSortField::Name,
        }
    }

    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            StoreSortField::Name => "s.name",
            StoreSortField::Email => "s.email",
            StoreSortField::Address => "s.address",
            StoreSortField::AverageRating => "s.average_rating",
            StoreSortField::CreatedAt => "s.created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort<F> {
    pub field: F,
    pub dir: SortDir,
}

impl<F> Sort<F> {
    pub fn new(field: F, dir: SortDir) -> Self {
        Self { field, dir }
    }
}

/// Case-insensitive substring filters for the user listing. `None` and empty
/// strings match everything.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}
