//! Coordinate reference systems and reprojection.

use std::fmt;

use geo::{Coord, MapCoords, MultiPolygon, Point};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ArealError, Result};

/// Horizontal datum used when building UTM and lon/lat definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datum {
    Nad83,
    Wgs84,
}

impl Datum {
    fn as_proj4(&self) -> &'static str {
        match self {
            Datum::Nad83 => "NAD83",
            Datum::Wgs84 => "WGS84",
        }
    }
}

/// A coordinate reference system, identified by EPSG code and/or a PROJ.4 definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crs {
    name: String,
    epsg: Option<u32>,
    proj4: Option<String>,
    geographic: bool,
}

impl Crs {
    /// Build a CRS from a built-in table of EPSG codes.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let proj4 = match code {
            4326 => "+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string(),
            4269 | 4937 => "+proj=longlat +datum=NAD83 +no_defs +type=crs".to_string(),
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs".to_string(),
            5070 => "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs +type=crs".to_string(),
            26901..=26923 => utm_proj4(code - 26900, true, Datum::Nad83),
            32601..=32660 => utm_proj4(code - 32600, true, Datum::Wgs84),
            32701..=32760 => utm_proj4(code - 32700, false, Datum::Wgs84),
            _ => return Err(ArealError::Projection(format!("unsupported EPSG code: {code}"))),
        };

        Ok(Self {
            name: format!("EPSG:{code}"),
            epsg: Some(code),
            geographic: is_longlat(&proj4),
            proj4: Some(proj4),
        })
    }

    /// Build a CRS from a PROJ.4 definition string.
    pub fn from_proj4(proj4: &str) -> Self {
        Self {
            name: proj4.to_string(),
            epsg: None,
            geographic: is_longlat(proj4),
            proj4: Some(proj4.to_string()),
        }
    }

    /// Interpret the WKT text of a shapefile `.prj` sidecar.
    pub fn from_prj_wkt(wkt: &str) -> Result<Self> {
        let wkt = wkt.trim();
        let head = wkt.split('[').next().unwrap_or("").trim().to_ascii_uppercase();
        let geographic = match head.as_str() {
            "GEOGCS" | "GEOGCRS" | "GEODCRS" => true,
            "PROJCS" | "PROJCRS" => false,
            _ => return Err(ArealError::Projection(format!("unrecognized WKT root: {head:?}"))),
        };

        // In WKT1 the outermost AUTHORITY is the last one in the string.
        let authority = Regex::new(r#"(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#)
            .map_err(|e| ArealError::Projection(e.to_string()))?;
        let code = authority.captures_iter(wkt)
            .last()
            .and_then(|caps| caps[1].parse::<u32>().ok());
        if let Some(crs) = code.and_then(|code| Self::from_epsg(code).ok()) {
            return Ok(crs);
        }

        let datum = if wkt.contains("1983") { Datum::Nad83 } else { Datum::Wgs84 };
        let name = Regex::new(r#"^[A-Z]+\[\s*"([^"]*)""#)
            .map_err(|e| ArealError::Projection(e.to_string()))?
            .captures(wkt)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| head.clone());

        let proj4 = if geographic {
            Some(format!("+proj=longlat +datum={} +no_defs +type=crs", datum.as_proj4()))
        } else {
            // ESRI-style names carry the UTM zone, e.g. "NAD_1983_UTM_Zone_15N".
            Regex::new(r"UTM_Zone_(\d+)([NS])")
                .map_err(|e| ArealError::Projection(e.to_string()))?
                .captures(&name)
                .and_then(|caps| Some((caps[1].parse::<u32>().ok()?, &caps[2] == "N")))
                .map(|(zone, north)| utm_proj4(zone, north, datum))
        };

        Ok(Self { name, epsg: code, proj4, geographic })
    }

    /// UTM zone CRS for a lon/lat center point.
    /// NAD83 UTM is only standard in the northern hemisphere; the south falls back to WGS84.
    pub fn utm_for(center: Coord<f64>, datum: Datum) -> Self {
        let zone = (((center.x + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
        let north = center.y >= 0.0;
        let datum = if datum == Datum::Nad83 && north { Datum::Nad83 } else { Datum::Wgs84 };

        let epsg = match (datum, north) {
            (Datum::Nad83, _) if zone <= 23 => Some(26900 + zone),
            (Datum::Nad83, _) => None,
            (Datum::Wgs84, true) => Some(32600 + zone),
            (Datum::Wgs84, false) => Some(32700 + zone),
        };

        let proj4 = utm_proj4(zone, north, datum);
        Self {
            name: epsg.map(|code| format!("EPSG:{code}")).unwrap_or_else(|| proj4.clone()),
            epsg,
            proj4: Some(proj4),
            geographic: false,
        }
    }

    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    #[inline] pub fn proj4(&self) -> Option<&str> { self.proj4.as_deref() }

    #[inline] pub fn is_geographic(&self) -> bool { self.geographic }

    #[inline] pub fn is_projected(&self) -> bool { !self.geographic }

    /// Datum guess used when picking a metric CRS for this one.
    pub fn datum(&self) -> Datum {
        match (self.epsg, self.proj4.as_deref()) {
            (Some(4269 | 4937 | 5070 | 26901..=26923), _) => Datum::Nad83,
            (_, Some(p)) if p.contains("NAD83") => Datum::Nad83,
            _ => Datum::Wgs84,
        }
    }

    /// Fail with `InvalidCrs` unless this CRS has linear (metric) units.
    pub fn require_projected(&self) -> Result<()> {
        if self.geographic { return Err(ArealError::InvalidCrs(self.to_string())) }
        Ok(())
    }

    /// Check if two CRS are equivalent.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if self.epsg.is_some() && self.epsg == other.epsg {
            return true;
        }
        if let (Some(a), Some(b)) = (&self.proj4, &other.proj4) {
            return normalize_proj4(a) == normalize_proj4(b);
        }
        self.name == other.name
    }

    fn to_proj(&self) -> Result<Proj4> {
        let proj4 = self.proj4.as_deref()
            .ok_or_else(|| ArealError::Projection(format!("no PROJ.4 definition for {self}")))?;
        Proj4::from_proj_string(proj4)
            .map_err(|e| ArealError::Projection(format!("failed to build PROJ.4 {proj4:?}: {e}")))
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool { self.is_equivalent(other) }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Fail unless both systems are projected and equivalent.
pub fn ensure_common_projected(a: &Crs, b: &Crs) -> Result<()> {
    a.require_projected()?;
    b.require_projected()?;
    if !a.is_equivalent(b) {
        return Err(ArealError::CrsMismatch(a.to_string(), b.to_string()));
    }
    Ok(())
}

/// Build a PROJ.4 string for a UTM zone.
fn utm_proj4(zone: u32, north: bool, datum: Datum) -> String {
    let south = if north { "" } else { " +south" };
    format!("+proj=utm +zone={zone}{south} +datum={} +units=m +no_defs +type=crs", datum.as_proj4())
}

fn is_longlat(proj4: &str) -> bool {
    proj4.split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"))
}

fn normalize_proj4(proj4: &str) -> Vec<&str> {
    let mut tokens = proj4.split_whitespace()
        .filter(|token| *token != "+type=crs" && *token != "+no_defs")
        .collect::<Vec<_>>();
    tokens.sort_unstable();
    tokens
}

/// Transforms coordinates between two systems. Geographic sides are in degrees.
pub(crate) struct Reprojector {
    from: Proj4,
    to: Proj4,
    from_geographic: bool,
    to_geographic: bool,
}

impl Reprojector {
    pub(crate) fn new(from: &Crs, to: &Crs) -> Result<Self> {
        Ok(Self {
            from: from.to_proj()?,
            to: to.to_proj()?,
            from_geographic: from.is_geographic(),
            to_geographic: to.is_geographic(),
        })
    }

    pub(crate) fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from_geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| ArealError::Projection(format!("CRS transform failed at ({}, {}): {e}", coord.x, coord.y)))?;

        Ok(if self.to_geographic {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    pub(crate) fn multipolygon(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        shape.try_map_coords(|coord| self.coord(coord))
    }

    pub(crate) fn point(&self, point: Point<f64>) -> Result<Point<f64>> {
        self.coord(point.0).map(Point::from)
    }
}
