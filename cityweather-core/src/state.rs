/// Progress of one fetch: started as `Loading`, settled once into `Error` or `Content`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T, E> {
    Loading,
    Error(E),
    Content(T),
}

impl<T, E> FetchState<T, E> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            FetchState::Content(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            FetchState::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl<T, E> From<Result<T, E>> for FetchState<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => FetchState::Content(value),
            Err(err) => FetchState::Error(err),
        }
    }
}
