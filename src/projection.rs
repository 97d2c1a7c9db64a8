// WGS 84 longitude/latitude to and from NAD83 / UTM zone 10N, Krüger series
// to sixth order

use std::sync::OnceLock;

use _model::Srid;
use geo::{Coord, MapCoords};

use crate::error::GeometryError;

pub fn to_metric<G>(geometry: &G, from: Srid) -> Result<G::Output, GeometryError>
where
    G: MapCoords<f64, f64>,
{
    match from {
        Srid::Utm10N => geometry.try_map_coords(check_finite),
        Srid::Wgs84 => geometry.try_map_coords(|c| utm10n().forward(c)),
    }
}

pub fn to_geographic<G>(geometry: &G, from: Srid) -> Result<G::Output, GeometryError>
where
    G: MapCoords<f64, f64>,
{
    match from {
        Srid::Wgs84 => geometry.try_map_coords(check_geographic),
        Srid::Utm10N => geometry.try_map_coords(|c| utm10n().inverse(c)),
    }
}

fn check_finite(c: Coord) -> Result<Coord, GeometryError> {
    if c.x.is_finite() && c.y.is_finite() {
        Ok(c)
    } else {
        Err(GeometryError::NotFinite { x: c.x, y: c.y })
    }
}

fn check_geographic(c: Coord) -> Result<Coord, GeometryError> {
    let c = check_finite(c)?;
    if c.x.abs() > 180.0 || c.y.abs() >= 90.0 {
        return Err(GeometryError::OutOfRange { x: c.x, y: c.y });
    }
    Ok(c)
}

fn utm10n() -> &'static TransverseMercator {
    static ZONE: OnceLock<TransverseMercator> = OnceLock::new();
    // GRS 80
    ZONE.get_or_init(|| TransverseMercator::new(6_378_137.0, 1.0 / 298.257_222_101, -123.0))
}

struct TransverseMercator {
    e: f64,
    // rectifying radius scaled by k0
    scale: f64,
    central_meridian: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;

impl TransverseMercator {
    fn new(a: f64, f: f64, central_meridian: f64) -> Self {
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let rectifying = a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1983433.0 * n6 / 1935360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167603.0 * n6 / 181440.0,
            49561.0 * n4 / 161280.0 - 179.0 * n5 / 168.0 + 6601661.0 * n6 / 7257600.0,
            34729.0 * n5 / 80640.0 - 3418889.0 * n6 / 1995840.0,
            212378941.0 * n6 / 319334400.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1118711.0 * n6 / 3870720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161280.0 - 11.0 * n5 / 504.0 - 830251.0 * n6 / 7257600.0,
            4583.0 * n5 / 161280.0 - 108847.0 * n6 / 3991680.0,
            20648693.0 * n6 / 638668800.0,
        ];

        Self {
            e: (f * (2.0 - f)).sqrt(),
            scale: K0 * rectifying,
            central_meridian,
            alpha,
            beta,
        }
    }

    // lon/lat degrees to easting/northing metres
    fn forward(&self, c: Coord) -> Result<Coord, GeometryError> {
        let c = check_geographic(c)?;
        let phi = c.y.to_radians();
        let lambda = (c.x - self.central_meridian).to_radians();

        let sin_phi = phi.sin();
        let t = (sin_phi.atanh() - self.e * (self.e * sin_phi).atanh()).sinh();
        let xi_p = t.atan2(lambda.cos());
        let eta_p = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        check_finite(Coord {
            x: FALSE_EASTING + self.scale * eta,
            y: self.scale * xi,
        })
    }

    // easting/northing metres to lon/lat degrees
    fn inverse(&self, c: Coord) -> Result<Coord, GeometryError> {
        let c = check_finite(c)?;
        let xi = c.y / self.scale;
        let eta = (c.x - FALSE_EASTING) / self.scale;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let tau_p = xi_p.sin() / (eta_p.sinh().powi(2) + xi_p.cos().powi(2)).sqrt();
        let lambda = eta_p.sinh().atan2(xi_p.cos());

        // solve for the conformal latitude with Newton's method
        let e2 = self.e * self.e;
        let mut tau = tau_p;
        for _ in 0..8 {
            let sigma = (self.e * (self.e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
            let tau_i = tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt();
            let delta = (tau_p - tau_i) / (1.0 + tau_i * tau_i).sqrt() * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * (1.0 + tau * tau).sqrt());
            tau += delta;
            if delta.abs() < 1e-14 {
                break;
            }
        }

        check_geographic(Coord {
            x: self.central_meridian + lambda.to_degrees(),
            y: tau.atan().to_degrees(),
        })
    }
}
