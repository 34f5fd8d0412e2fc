use crate::database_ops::tmdb::{TmdbCastMember, TmdbCredits, TmdbCrewMember};

/// Director value recorded when no crew member carries the "Director" job.
pub const UNKNOWN_DIRECTOR: &str = "Unknown";

/// Maximum number of cast names kept per movie.
pub const CAST_LIMIT: usize = 3;

const DIRECTOR_JOB: &str = "Director";

/// Director and leading cast extracted from a credits payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieCredits {
    /// First crew member whose job is exactly "Director", in API order.
    pub director: Option<String>,
    /// Up to [`CAST_LIMIT`] names, in API order.
    pub cast: Vec<String>,
}

impl MovieCredits {
    pub fn from_payload(payload: &TmdbCredits) -> Self {
        Self {
            director: select_director(&payload.crew),
            cast: select_cast(&payload.cast),
        }
    }
}

/// First crew entry credited as "Director". No secondary ordering.
pub fn select_director(crew: &[TmdbCrewMember]) -> Option<String> {
    crew.iter()
        .find(|member| member.job.as_deref() == Some(DIRECTOR_JOB))
        .map(|member| member.name.clone())
}

/// Leading cast names in billing order as returned by the API.
pub fn select_cast(cast: &[TmdbCastMember]) -> Vec<String> {
    cast.iter()
        .take(CAST_LIMIT)
        .map(|member| member.name.clone())
        .collect()
}

/// Outcome of a credits lookup for one movie.
///
/// `Resolved` with `director: None` is the ordinary "nobody credited" case;
/// `Failed` means the request or the payload was unusable. Both degrade to
/// the same record values, but only `Failed` is worth a warning.
#[derive(Debug)]
pub enum CreditsLookup {
    Resolved(MovieCredits),
    Failed(anyhow::Error),
}

impl CreditsLookup {
    /// Director name, or [`UNKNOWN_DIRECTOR`].
    pub fn director(&self) -> &str {
        match self {
            CreditsLookup::Resolved(MovieCredits {
                director: Some(name),
                ..
            }) => name,
            _ => UNKNOWN_DIRECTOR,
        }
    }

    /// Cast names; empty when the lookup failed.
    pub fn cast(&self) -> &[String] {
        match self {
            CreditsLookup::Resolved(credits) => &credits.cast,
            CreditsLookup::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CreditsLookup::Failed(_))
    }

    /// True for a successful lookup that credits no director.
    pub fn missing_director(&self) -> bool {
        matches!(
            self,
            CreditsLookup::Resolved(MovieCredits { director: None, .. })
        )
    }
}
