//! Shared workbook fixtures, built in memory with rust_xlsxwriter
#![allow(dead_code)]

use rust_xlsxwriter::Workbook;

/// One fixture cell
#[derive(Debug, Clone)]
pub enum Fx {
    T(&'static str),
    N(f64),
    Blank,
}

/// Serialize sheets of fixture rows to xlsx bytes
pub fn workbook_bytes(sheets: &[(&str, Vec<Vec<Fx>>)]) -> Vec<u8> {
    let mut book = Workbook::new();
    for (name, rows) in sheets {
        let sheet = book.add_worksheet();
        sheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Fx::T(text) => {
                        sheet.write_string(r as u32, c as u16, *text).unwrap();
                    }
                    Fx::N(n) => {
                        sheet.write_number(r as u32, c as u16, *n).unwrap();
                    }
                    Fx::Blank => {}
                }
            }
        }
    }
    book.save_to_buffer().unwrap()
}

/// A statement line: label plus one value per data column
pub fn line(label: &'static str, values: &[f64]) -> Vec<Fx> {
    std::iter::once(Fx::T(label))
        .chain(values.iter().map(|v| Fx::N(*v)))
        .collect()
}

fn title_rows() -> Vec<Vec<Fx>> {
    vec![
        vec![Fx::T("AUTOMOTRIZ DEL NORTE S.A. DE C.V.")],
        vec![Fx::T("Estado de resultados")],
        vec![Fx::T("Cifras en pesos")],
        vec![Fx::T("Periodo mensual")],
    ]
}

/// Income statement with the header in row 4:
/// col 1 "Presupuesto", col 2 "Variación", col 3 "Año Anterior 2024",
/// col 4 "%", col 5 "Actual 2025".
pub fn standard_statement() -> Vec<u8> {
    let mut rows = title_rows();
    rows.push(vec![
        Fx::T("Concepto"),
        Fx::T("Presupuesto"),
        Fx::T("Variación"),
        Fx::T("Año Anterior 2024"),
        Fx::T("%"),
        Fx::T("Actual 2025"),
    ]);
    // values: presupuesto, variación, año anterior, %, actual
    rows.push(vec![Fx::T("RESULTADOS")]);
    rows.push(line("Ventas de autos nuevos", &[9_000_000.0, 500_000.0, 8_000_000.0, 0.52, 9_500_000.0]));
    rows.push(line("Ventas de autos usados", &[2_000_000.0, -100_000.0, 1_800_000.0, 0.12, 1_900_000.0]));
    rows.push(line("Servicio", &[1_200_000.0, 50_000.0, 1_100_000.0, 0.07, 1_250_000.0]));
    rows.push(line("Costos de autos nuevos", &[8_000_000.0, 400_000.0, 7_100_000.0, 0.47, 8_400_000.0]));
    rows.push(line("Costo de autos usados", &[1_700_000.0, -80_000.0, 1_550_000.0, 0.10, 1_620_000.0]));
    rows.push(line("Costo de servicio", &[500_000.0, 20_000.0, 450_000.0, 0.03, 520_000.0]));
    rows.push(line("Utilidad bruta", &[2_000_000.0, 60_000.0, 1_800_000.0, 0.14, 2_110_000.0]));
    rows.push(line("Gastos generales", &[600_000.0, 10_000.0, 550_000.0, 0.04, 610_000.0]));
    rows.push(line("Gastos de personal", &[700_000.0, 15_000.0, 640_000.0, 0.05, 715_000.0]));
    rows.push(line("Rentas", &[150_000.0, 0.0, 150_000.0, 0.01, 150_000.0]));
    rows.push(line("Utilidad neta", &[400_000.0, 25_000.0, 330_000.0, 0.03, 425_000.0]));

    workbook_bytes(&[
        ("Portada", vec![vec![Fx::T("Reporte mensual")]]),
        ("Edo de Resultados", rows),
    ])
}

/// Statement whose prior column (3, "Año Anterior 2024") repeats the current
/// column (5, "Actual 2025") verbatim; column 4 carries the real comparison.
pub fn duplicated_prior_statement() -> Vec<u8> {
    let mut rows = title_rows();
    rows.push(vec![
        Fx::T("Concepto"),
        Fx::Blank,
        Fx::Blank,
        Fx::T("Año Anterior 2024"),
        Fx::T("Mes comparativo"),
        Fx::T("Actual 2025"),
    ]);
    let data: &[(&'static str, f64, f64)] = &[
        ("Ventas de autos nuevos", 9_500_000.0, 8_000_000.0),
        ("Servicio", 1_250_000.0, 1_100_000.0),
        ("Costos de autos nuevos", 8_400_000.0, 7_100_000.0),
        ("Costo de servicio", 520_000.0, 450_000.0),
        ("Utilidad bruta", 1_830_000.0, 1_550_000.0),
        ("Gastos generales", 610_000.0, 550_000.0),
        ("Utilidad neta", 425_000.0, 330_000.0),
    ];
    for (label, current, comparison) in data {
        rows.push(vec![
            Fx::T(*label),
            Fx::Blank,
            Fx::Blank,
            Fx::N(*current),
            Fx::N(*comparison),
            Fx::N(*current),
        ]);
    }
    workbook_bytes(&[("Estado de Resultados", rows)])
}

/// Workbook whose only sheet is text
pub fn text_only_statement() -> Vec<u8> {
    workbook_bytes(&[(
        "Edo de Resultados",
        vec![
            vec![Fx::T("Concepto"), Fx::T("Actual 2025")],
            vec![Fx::T("Ventas de autos nuevos"), Fx::T("pendiente")],
            vec![Fx::T("Utilidad neta"), Fx::T("pendiente")],
        ],
    )])
}

/// Workbook with a single sheet and no cells
pub fn blank_workbook() -> Vec<u8> {
    workbook_bytes(&[("Hoja1", Vec::new())])
}
