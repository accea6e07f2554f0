pub mod clusters_mgmt;
pub mod connection;
pub mod poll;
pub mod request;
pub mod service_logs;

pub use connection::{Connection, ConnectionBuilder};
pub use poll::{poll, PollRequest, Polled, Predicate};
pub use request::{
    ActionRequest, AddRequest, DeleteRequest, GetRequest, ListRequest, ListResponse, Response,
    UpdateRequest,
};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in a path segment. `/` and `%` are included so that
/// identifiers can't add segments or be decoded twice.
const SEGMENT_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes one path segment, such as a cluster or user identifier.
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("clusters"), "clusters");
        assert_eq!(encode_segment("jane doe"), "jane%20doe");
        assert_eq!(encode_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(encode_segment("50%"), "50%25");
    }
}
