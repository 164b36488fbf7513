//! Shared model builders for the integration tests

#![allow(dead_code)]

use seepage_core::{FluDef, Interp1, PoreModel, Seepage, SeepageConfig, Vec3};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn water() -> FluDef {
    FluDef::constant("water", 1000.0, 1.0e-3, 4200.0).unwrap()
}

pub fn methane() -> FluDef {
    FluDef::constant("methane", 100.0, 1.1e-5, 2200.0).unwrap()
}

pub fn pore() -> PoreModel {
    PoreModel::new(1.0, 1.0e-9).unwrap()
}

/// The reference pair: two unit cells, one face, 1 MPa against 0 Pa
pub fn two_cells(cond: f64) -> Seepage {
    let mut model = Seepage::default();
    model.add_fludef(water());
    let a = model.add_cell(Vec3::zeros(), pore());
    let b = model.add_cell(Vec3::new(1.0, 0.0, 0.0), pore());
    model.add_face(a, b, cond).unwrap();
    model.fill(a, 1.0e6, &[1.0.into()]).unwrap();
    model.fill(b, 0.0, &[1.0.into()]).unwrap();
    model
}

/// Vertical `nx × nz` section of water and methane under gravity
///
/// Saturations and pressures vary from cell to cell; faces join horizontal
/// and vertical neighbours.
pub fn two_phase_section(nx: usize, nz: usize, config: SeepageConfig) -> Seepage {
    let mut model = Seepage::new(config);
    model.add_fludef(water());
    model.add_fludef(methane());
    let kr = model.add_kr_curve(Interp1::new(vec![0.0, 0.2, 1.0], vec![0.0, 0.0, 1.0]).unwrap());

    for k in 0..nz {
        for i in 0..nx {
            let cell = model.add_cell(Vec3::new(i as f64, 0.0, k as f64), pore());
            let s_gas = 0.1 + 0.8 * ((i + 2 * k) % 5) as f64 / 4.0;
            let p = 1.0e6 + 2.0e5 * ((3 * i + k) % 4) as f64;
            model
                .fill(cell, p, &[(1.0 - s_gas).into(), s_gas.into()])
                .unwrap();
        }
    }
    for k in 0..nz {
        for i in 0..nx {
            let cell = k * nx + i;
            if i + 1 < nx {
                let face = model.add_face(cell, cell + 1, 1.0e-13).unwrap();
                model.set_face_kr(face, 1, Some(kr)).unwrap();
            }
            if k + 1 < nz {
                let face = model.add_face(cell, cell + nx, 1.0e-13).unwrap();
                model.set_face_kr(face, 1, Some(kr)).unwrap();
            }
        }
    }
    model
}
