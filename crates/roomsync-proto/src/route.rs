//! Backend route table.
//!
//! Room ids are embedded in paths as a single percent-encoded segment, so a
//! room named `Living room` maps to `/api/pieces/Living%20room/...`.

use std::fmt;

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Every backend operation the client uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /api/pieces`
    Rooms,
    /// `GET /api/stream`
    Stream,
    /// `POST /api/pieces/{id}/temperature-cible`
    TargetTemperature(String),
    /// `POST /api/pieces/{id}/climatisation`
    AirConditioning(String),
    /// `POST /api/pieces/{id}/mode-automatique`
    AutoMode(String),
    /// `POST /api/capteurs/pieces`
    CreateRoom,
    /// `POST /api/capteurs/pieces/{id}/demarrer`
    StartSensors(String),
    /// `POST /api/capteurs/pieces/{id}/arreter`
    StopSensors(String),
}

const ROOMS: &str = "/api/pieces";
const STREAM: &str = "/api/stream";
const SENSOR_ROOMS: &str = "/api/capteurs/pieces";

impl Route {
    /// HTTP method for this route.
    pub fn method(&self) -> Method {
        match self {
            Self::Rooms | Self::Stream => Method::Get,
            Self::TargetTemperature(_)
            | Self::AirConditioning(_)
            | Self::AutoMode(_)
            | Self::CreateRoom
            | Self::StartSensors(_)
            | Self::StopSensors(_) => Method::Post,
        }
    }

    /// Absolute path, room ids percent-encoded.
    pub fn path(&self) -> String {
        match self {
            Self::Rooms => ROOMS.to_owned(),
            Self::Stream => STREAM.to_owned(),
            Self::TargetTemperature(id) => format!("{ROOMS}/{}/temperature-cible", encode_segment(id)),
            Self::AirConditioning(id) => format!("{ROOMS}/{}/climatisation", encode_segment(id)),
            Self::AutoMode(id) => format!("{ROOMS}/{}/mode-automatique", encode_segment(id)),
            Self::CreateRoom => SENSOR_ROOMS.to_owned(),
            Self::StartSensors(id) => format!("{SENSOR_ROOMS}/{}/demarrer", encode_segment(id)),
            Self::StopSensors(id) => format!("{SENSOR_ROOMS}/{}/arreter", encode_segment(id)),
        }
    }

    /// Match a method and path back to a route. `None` for unknown paths.
    pub fn parse(method: Method, path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or(path);
        let route = match (method, path) {
            (Method::Get, ROOMS) => Self::Rooms,
            (Method::Get, STREAM) => Self::Stream,
            (Method::Post, SENSOR_ROOMS) => Self::CreateRoom,
            (Method::Post, _) => {
                if let Some(rest) = path.strip_prefix(ROOMS).and_then(|r| r.strip_prefix('/')) {
                    let (id, action) = rest.split_once('/')?;
                    let id = decode_segment(id)?;
                    match action {
                        "temperature-cible" => Self::TargetTemperature(id),
                        "climatisation" => Self::AirConditioning(id),
                        "mode-automatique" => Self::AutoMode(id),
                        _ => return None,
                    }
                } else {
                    let rest = path.strip_prefix(SENSOR_ROOMS)?.strip_prefix('/')?;
                    let (id, action) = rest.split_once('/')?;
                    let id = decode_segment(id)?;
                    match action {
                        "demarrer" => Self::StartSensors(id),
                        "arreter" => Self::StopSensors(id),
                        _ => return None,
                    }
                }
            },
            (Method::Get, _) => return None,
        };
        Some(route)
    }
}

/// Percent-encode everything outside RFC 3986 unreserved characters.
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Reverse of [`encode_segment`]. `None` on malformed escapes or non-UTF-8.
pub fn decode_segment(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_paths() {
        assert_eq!(
            Route::TargetTemperature("salon".into()).path(),
            "/api/pieces/salon/temperature-cible"
        );
        assert_eq!(Route::AirConditioning("salon".into()).path(), "/api/pieces/salon/climatisation");
        assert_eq!(Route::AutoMode("salon".into()).path(), "/api/pieces/salon/mode-automatique");
        assert_eq!(Route::CreateRoom.path(), "/api/capteurs/pieces");
        assert_eq!(Route::StopSensors("salon".into()).path(), "/api/capteurs/pieces/salon/arreter");
    }

    #[test]
    fn room_ids_are_escaped() {
        let route = Route::AutoMode("Living room/2".into());
        assert_eq!(route.path(), "/api/pieces/Living%20room%2F2/mode-automatique");
        assert_eq!(Route::parse(Method::Post, &route.path()), Some(route));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(Route::parse(Method::Get, "/api/pieces/x/climatisation"), None);
        assert_eq!(Route::parse(Method::Post, "/api/pieces/x/unknown"), None);
        assert_eq!(Route::parse(Method::Post, "/api/pieces/%zz/climatisation"), None);
        assert_eq!(Route::parse(Method::Get, "/api/pieces"), Some(Route::Rooms));
    }
}
