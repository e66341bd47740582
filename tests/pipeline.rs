use aedes_report::filters::{apply_date_filter, DateRange};
use aedes_report::loader::load_csv_bytes;
use aedes_report::registry::FacilityRegistry;
use aedes_report::reports;
use aedes_report::{
    get_filtered_data, normalize, safe_render, Cell, ColumnData, DataProcessor, FilterSet,
    ProcessorConfig, RenderView, Table,
};
use chrono::NaiveDate;

const SAMPLE: &str = "\
cod_renipress,localidad_eess,departamento_x,nombre_prov,sector,tipoActividadInspeccion,atencion_vivienda_indicador,viv_positiva,consumo_larvicida,fecha_inspeccion,year,observaciones,manzanas,llantas_I,llantas_P
5060,LA LIBERTAD,PIURA,PIURA,SAN JUAN,Cerco,1,1,12.5,2024-03-05 08:30:00,2024,,3,4,1
5060,LA LIBERTAD,PIURA,PIURA,SAN JUA,cerco,1,0,nan,2024-03-06T09:15:30.250Z,2024,,,2,0
5060,LA LIBERTAD,PIURA,PIURA,nan,Vigilancia,2,0,0,05/04/2024,,nan,7,0,0
5044,GUSTAVO LANATTA LUJAN,TUMBES,TUMBES,LA UNION,CERCO,3,,1,no es fecha,2023,None,,1,1
7276,LA PRIMAVERA,PIURA,SULLANA,,Control Larvario,4,0,\"1,000.5\",2024-04-10,2024,,x,3,0
";

fn load(config: &ProcessorConfig) -> (Table, aedes_report::NormalizeReport) {
    let (raw, _) = load_csv_bytes(SAMPLE.as_bytes()).unwrap();
    normalize(raw, config).unwrap()
}

#[test]
fn normalization_is_idempotent() {
    for config in [
        ProcessorConfig::default(),
        ProcessorConfig::default().with_categorical_compression(false),
    ] {
        let (once, _) = load(&config);
        let (twice, report) = normalize(once.to_raw(), &config).unwrap();
        assert_eq!(once, twice);
        assert!(report.dropped_columns.is_empty());
    }
}

#[test]
fn normalized_table_has_no_missing_markers() {
    let (table, report) = load(&ProcessorConfig::default());
    assert_eq!(report.dropped_columns, vec!["observaciones".to_string()]);
    for column in table.columns() {
        match &column.data {
            ColumnData::Number(values) => assert!(values.iter().all(|v| v.is_finite())),
            data if data.is_text() => {
                for row in 0..table.rows() {
                    let value = data.text_at(row).unwrap();
                    assert!(
                        !matches!(value, "nan" | "NaN" | "None"),
                        "{} row {row} holds {value:?}",
                        column.name
                    );
                }
            }
            _ => {}
        }
    }
    // Thousands separators are stripped; garbage becomes zero.
    assert_eq!(
        table.numbers("consumo_larvicida"),
        Some(&[12.5, 0.0, 0.0, 1.0, 1000.5][..])
    );
    assert_eq!(table.cell("year", 3), Cell::Null);
    assert_eq!(table.cell("year", 2), Cell::Integer(2024));
    assert!(table.text("manzanas").is_some());
}

#[test]
fn equality_filters_never_grow_the_view() {
    let (table, _) = load(&ProcessorConfig::default());
    let base = FilterSet::new();
    let steps = [
        ("departamento_x", "PIURA"),
        ("nombre_prov", "PIURA"),
        ("sector", "SAN JUAN"),
        ("cod_renipress", "5060"),
    ];
    let mut filters = base;
    let mut previous = get_filtered_data(&table, Some("cerco"), &filters).rows();
    assert_eq!(previous, 3);
    for (column, value) in steps {
        filters = filters.with(column, value);
        let rows = get_filtered_data(&table, Some("cerco"), &filters).rows();
        assert!(rows <= previous, "{column} grew the view");
        previous = rows;
    }
    assert_eq!(previous, 1);
}

#[test]
fn filtering_leaves_the_canonical_table_alone() {
    let (table, _) = load(&ProcessorConfig::default());
    let before = table.clone();
    let mapping = aedes_report::sectors::SectorMapping::from([(
        "SAN JUA".to_string(),
        "SAN JUAN".to_string(),
    )]);
    let filters = FilterSet::new().with_sector_mapping(mapping);
    let view = get_filtered_data(&table, None, &filters);
    assert_eq!(table, before);
    assert_eq!(view.text("sector").unwrap().text_at(1), Some("SAN JUAN"));
}

#[test]
fn date_range_is_inclusive_by_day() {
    let (table, _) = load(&ProcessorConfig::default());
    let range = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
    );
    let view = apply_date_filter(&table, &range);
    // 03-05 08:30, 03-06 and 04-05 (day-first slash date); null dates are dropped.
    assert_eq!(view.rows(), 3);
}

#[test]
fn coverage_from_a_loaded_file() {
    let mut csv = String::from("cod_renipress,atencion_vivienda_indicador,viv_positiva\n");
    for (code, n) in [(1, 40), (2, 10), (3, 5)] {
        for _ in 0..n {
            csv.push_str(&format!("4242,{code},0\n"));
        }
    }
    let (raw, _) = load_csv_bytes(csv.as_bytes()).unwrap();
    let processor = DataProcessor::new(raw, ProcessorConfig::default())
        .unwrap()
        .with_registry(FacilityRegistry::from_entries([(4242, "PUESTO".to_string(), 100)]));
    let view = processor.view(None, &FilterSet::new());
    let rows = reports::coverage_percentages(&view, processor.registry());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].porc_inspeccionadas, 40.0);
    assert_eq!(rows[0].porc_cerradas, 10.0);
    assert_eq!(rows[0].porc_renuentes, 5.0);
    assert_eq!(rows[0].cobertura_total, 55.0);
}

#[test]
fn percentages_are_never_negative_or_nan() {
    let (table, _) = load(&ProcessorConfig::default());
    let registry = FacilityRegistry::builtin();
    for row in reports::coverage_percentages(&table, registry) {
        for pct in [row.porc_inspeccionadas, row.porc_no_intervenidas, row.cobertura_total] {
            assert!(pct.is_finite() && pct >= 0.0);
        }
    }
    for row in reports::container_statistics(&table) {
        assert!(row.porc_positivos.is_finite() && row.porc_positivos >= 0.0);
    }
    for row in reports::monthly_trends(&table) {
        assert!(row.indice_aedico.is_finite() && row.indice_aedico >= 0.0);
    }
}

#[test]
fn render_guard_bounds_memory() {
    // About 3.5 MB of text against a 1 MB ceiling.
    let rows = 20_000;
    let cell = "X".repeat(20);
    let table = Table::new(
        (0..4)
            .map(|c| {
                aedes_report::Column::new(
                    format!("c{c}"),
                    ColumnData::Text((0..rows).map(|r| format!("{cell}{r}")).collect()),
                )
            })
            .collect(),
    );
    let render = safe_render(&table, 50_000, 1.0);
    assert!(render.stats.truncated);
    assert!(render.stats.total_mb > 1.0);
    assert!(render.stats.shown_mb <= 0.9);
    match render.view {
        RenderView::Rows(slice) => {
            assert!(slice.rows() < rows);
            assert!(slice.estimated_bytes() as f64 / (1024.0 * 1024.0) <= 0.9);
        }
        RenderView::Structure(_) => panic!("a row slice fits"),
    }
}

fn text_table(values: Vec<String>) -> Table {
    Table::new(vec![aedes_report::Column::new("observacion", ColumnData::Text(values))])
}

#[test]
fn render_guard_shrinks_until_the_slice_fits() {
    // Heavy rows first, so the memory-derived estimate is far too optimistic
    // and the slice has to shrink several times.
    let mut values: Vec<String> = (0..2_000).map(|_| "A".repeat(2_000)).collect();
    values.extend((0..98_000).map(|_| "x".to_string()));
    let table = text_table(values);
    let render = safe_render(&table, 50_000, 1.0);
    assert!(render.stats.total_mb > 6.0);
    assert!(render.stats.truncated);
    assert!(render.stats.shown_mb <= 0.9);
    assert!(render.stats.shown_rows >= aedes_report::render::MIN_ROWS);
    assert!(render.stats.shown_rows < 1_000);
    match render.view {
        RenderView::Rows(slice) => {
            assert_eq!(slice.rows(), render.stats.shown_rows);
            assert!(slice.estimated_bytes() as f64 / (1024.0 * 1024.0) <= 0.9);
        }
        RenderView::Structure(_) => panic!("a slice of the minimum size fits"),
    }
}

#[test]
fn render_guard_floors_the_memory_estimate() {
    // Light rows first: the estimate (about 570 rows) is raised to 1000,
    // and those 1000 rows fit.
    let mut values: Vec<String> = (0..1_000).map(|_| "x".to_string()).collect();
    values.extend((0..9_000).map(|_| "B".repeat(1_000)));
    let render = safe_render(&text_table(values), 50_000, 0.5);
    assert!(render.stats.truncated);
    assert_eq!(render.stats.shown_rows, 1_000);

    // Uniform rows: the floored 1000 rows are too heavy and shrink once.
    let uniform = text_table((0..20_000).map(|_| "C".repeat(100)).collect());
    let render = safe_render(&uniform, 50_000, 0.1);
    assert_eq!(render.stats.shown_rows, 750);
    assert!(render.stats.shown_mb <= 0.09);
}

#[test]
fn loads_from_disk_with_latin1_fallback() {
    let dir = std::env::temp_dir().join(format!("aedes_report_it_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("latin1.csv");
    std::fs::write(&path, b"sector,dirs\nSANS\xd3N,1\n").unwrap();
    let (processor, report) = DataProcessor::load(&path, ProcessorConfig::default()).unwrap();
    assert_eq!(report.encoding.name(), "latin-1");
    assert_eq!(processor.data().cell("sector", 0), Cell::Text("SANSÓN"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_reported() {
    let err = DataProcessor::load(
        std::path::Path::new("/nonexistent/inspecciones.csv"),
        ProcessorConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, aedes_report::ProcessorError::FileNotFound { .. }));
}
