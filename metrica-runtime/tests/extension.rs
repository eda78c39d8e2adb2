//! End-to-end behaviour of the catalog and the extension cycle

use std::fs;
use std::thread::sleep;
use std::time::Duration;
use metrica_core::codes;
use metrica_runtime::{
    CompileFailure, Compiler, GeneratedSource, LoadOutcome, LoadStage, LoaderConfig, RuntimeLoader,
};
use metrica_units::{
    try_parse, Catalog, Dimension, Measure, Module, NumberFormat, NumberStyles, Quantity, Scale,
    ScaleRef, Unit, UnitRef,
};

fn seeded() -> (RuntimeLoader, Catalog<f64>) {
    let mut catalog = Catalog::new();
    let mut loader = RuntimeLoader::new(LoaderConfig::default());
    loader.install(&mut catalog, Module::builtin(), None).unwrap();
    (loader, catalog)
}

fn symbols(catalog: &Catalog<f64>) -> Vec<String> {
    catalog.symbols().map(String::from).collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

#[test]
fn kilometer_to_meter() {
    let mut catalog: Catalog<f64> = Catalog::new();
    let meter = UnitRef::new(Unit::new("Meter", ["m"], 1, Dimension::LENGTH, 1.0));
    let km = UnitRef::new(Unit::new("Kilometer", ["km"], 1, Dimension::LENGTH, 1000.0));
    catalog.add(meter.clone()).unwrap();
    catalog.add(km.clone()).unwrap();

    let q = meter.from(&km.quantity(1.0)).unwrap();
    assert_eq!(q.value, 1000.0);
    assert!(q.unit == meter);
}

#[test]
fn kelvin_level_to_celsius() {
    let kelvin = UnitRef::new(Unit::new("Kelvin", ["K"], 7, Dimension::TEMPERATURE, 1.0));
    let kelvin_scale = ScaleRef::new(Scale::new("KelvinScale", ["°K"], kelvin.clone(), 0.0, Some("AbsoluteZero"), 7));
    let celsius = ScaleRef::new(Scale::new("Celsius", ["°C"], kelvin, 273.15, Some("AbsoluteZero"), 7));

    let level = celsius.from_level(&kelvin_scale.level(373.15)).unwrap();
    assert!(close(level.value, 100.0));
    assert!(level.scale == celsius);
}

#[test]
fn conversions_round_trip_within_families() {
    let (_, catalog) = seeded();
    for family in [1, 2, 3, 5, 7, 11] {
        let units: Vec<&UnitRef<f64>> = catalog.items_in_family(family).filter_map(Measure::as_unit).collect();
        for a in &units {
            for b in &units {
                let q = a.quantity(12.5);
                let there = b.from(&q).unwrap();
                let back = a.from(&there).unwrap();
                assert!(close(back.value, 12.5), "{} -> {} -> {}", a.name(), b.name(), a.name());
            }
        }
    }

    let scales: Vec<&ScaleRef<f64>> = catalog.scales().collect();
    for a in &scales {
        for b in &scales {
            let l = a.level(-40.0);
            let back = a.from_level(&b.from_level(&l).unwrap()).unwrap();
            assert!(close(back.value, -40.0), "{} <-> {}", a.name(), b.name());
        }
    }
}

#[test]
fn torque_is_not_energy() {
    let (_, catalog) = seeded();
    let joule = catalog.unit("J").unwrap();
    let newton_meter = catalog.unit("N*m").unwrap();
    assert_eq!(joule.sense(), newton_meter.sense());
    assert!(newton_meter.from(&joule.quantity(1.0)).is_err());
}

#[test]
fn reaumur_text_converts_to_celsius() {
    let (_, catalog) = seeded();
    let allowed: Vec<Measure<f64>> = ["KelvinScale", "Celsius", "Reaumur", "Fahrenheit"]
        .iter()
        .filter_map(|n| catalog.scale_named(n).cloned().map(Measure::Scale))
        .collect();
    let parsed = try_parse("-80 deg.Re", &allowed, NumberStyles::ANY, &NumberFormat::invariant()).unwrap();
    let Some(reaumur) = parsed.measure().as_scale().cloned() else {
        panic!("expected a level, got {}", parsed);
    };
    let level = reaumur.level(*parsed.value());

    let celsius = catalog.scale("°C").unwrap();
    assert!(close(celsius.from_level(&level).unwrap().value, -100.0));
    let kelvin = catalog.scale("deg.K").unwrap();
    assert!(close(kelvin.from_level(&level).unwrap().value, 173.15));
}

#[test]
fn rated_unit_follows_its_rate() {
    let (_, catalog) = seeded();
    let eur = catalog.unit("EUR").unwrap();
    let usd = catalog.unit("USD").unwrap();
    assert!(close(eur.from(&usd.quantity(100.0)).unwrap().value, 86.0));

    usd.rate().unwrap().set(0.9).unwrap();
    assert!(close(eur.from(&usd.quantity(100.0)).unwrap().value, 90.0));
    assert!(usd.rate().unwrap().set(0.0).is_err());
    assert!(eur.rate().is_none());
}

#[test]
fn duplicate_symbol_leaves_catalog_unchanged() {
    let (_, mut catalog) = seeded();
    let before = symbols(&catalog);
    let clash = UnitRef::new(Unit::new("Micron", ["µm", "mm"], 1, Dimension::LENGTH, 1e-6));
    assert!(catalog.add(clash).is_err());
    assert_eq!(symbols(&catalog), before);
}

#[test]
fn longest_symbol_wins() {
    let (_, catalog) = seeded();
    let lengths: Vec<Measure<f64>> = catalog.items_in_family(1).cloned().collect();
    let parsed = try_parse("10 mm", &lengths, NumberStyles::ANY, &NumberFormat::invariant()).unwrap();
    assert_eq!(parsed.measure().name(), "Millimeter");
    assert_eq!(*parsed.value(), 10.0);
}

#[test]
fn nautical_mile_added_at_runtime() {
    let (mut loader, mut catalog) = seeded();
    assert!(catalog.find("nmi").is_none());

    let report = loader
        .load_str(&mut catalog, "unit NauticalMile \"nmi\" = 1852 * Meter;")
        .unwrap();
    assert_eq!(report.outcome, LoadOutcome::Compiled);
    assert_eq!(report.added, 1);

    let nmi = catalog.unit("nmi").unwrap();
    let meter = catalog.unit("m").unwrap();
    let q = nmi.from(&Quantity::new(1852.0, meter.clone())).unwrap();
    assert!(close(q.value, 1.0));
    assert!(q.unit == *nmi);
    assert_eq!(nmi.family(), meter.family());
    assert!(!catalog.is_primary(catalog.find("nmi").unwrap()));
}

#[test]
fn later_cycles_see_earlier_ones() {
    let (mut loader, mut catalog) = seeded();
    loader.load_str(&mut catalog, "unit NauticalMile \"nmi\" = 1852 * Meter;").unwrap();
    let report = loader
        .load_str(&mut catalog, "unit Knot \"kn\" = NauticalMile / Hour relative to MeterPerSecond;")
        .unwrap();
    assert_eq!(report.outcome, LoadOutcome::Compiled);

    let knot = catalog.unit("kn").unwrap();
    let kmh = catalog.unit("km/h").unwrap();
    assert!(close(kmh.from(&knot.quantity(1.0)).unwrap().value, 1.852));

    // Same text again adds nothing
    let again = loader.load_str(&mut catalog, "unit NauticalMile \"nmi\" = 1852 * Meter;").unwrap();
    assert_eq!(again.outcome, LoadOutcome::NoDelta);
}

#[test]
fn undefined_reference_is_reported() {
    let (mut loader, mut catalog) = seeded();
    let before = symbols(&catalog);
    let err = loader
        .load_str(&mut catalog, "unit NauticalMile \"nmi\" = 1852 * Metre;")
        .unwrap_err();
    assert_eq!(err.stage, LoadStage::Parse);
    assert_eq!(err.diagnostics[0].code, codes::UNDEFINED_REF);
    assert_eq!(symbols(&catalog), before);
}

struct Rejecting;

impl Compiler for Rejecting {
    fn compile(
        &self,
        _source: &GeneratedSource,
        _references: &[std::path::PathBuf],
        _output: Option<&std::path::Path>,
    ) -> Result<Module, CompileFailure> {
        Err(CompileFailure {
            diagnostics: vec![metrica_core::Diagnostic::compile("error: toolchain exploded")],
        })
    }
}

#[test]
fn compile_failure_is_atomic() {
    let mut catalog = Catalog::new();
    let mut loader = RuntimeLoader::with_compiler(LoaderConfig::default(), Box::new(Rejecting));
    loader.install(&mut catalog, Module::builtin(), None).unwrap();
    let before = symbols(&catalog);

    let err = loader
        .load_str(&mut catalog, "unit NauticalMile \"nmi\" = 1852 * Meter;\nunit Cable \"cb\" = 185.2 * Meter;")
        .unwrap_err();
    assert_eq!(err.stage, LoadStage::Compile);
    assert_eq!(err.diagnostics[0].message, "error: toolchain exploded");
    assert_eq!(symbols(&catalog), before);
    assert_eq!(loader.modules().len(), 1);
}

#[test]
fn merge_collision_is_atomic() {
    let (mut loader, mut catalog) = seeded();
    // A symbol owned by an entry the loader never saw
    catalog.add(UnitRef::new(Unit::new("Rogue", ["cb"], 99, Dimension::LENGTH, 1.0))).unwrap();
    let before = symbols(&catalog);

    let err = loader
        .load_str(&mut catalog, "unit League \"lea\" = 4828.032 * Meter;\nunit Cable \"cb\" = 185.2 * Meter;")
        .unwrap_err();
    assert_eq!(err.stage, LoadStage::Merge);
    assert_eq!(err.diagnostics[0].code, codes::DUPLICATE_SYMBOL);
    assert_eq!(symbols(&catalog), before);
    assert!(catalog.find("lea").is_none());
}

#[test]
fn file_definitions_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    fs::create_dir(&cache).unwrap();
    let source = dir.path().join("nautical.units");
    fs::write(&source, "unit NauticalMile \"nmi\" = 1852 * Meter;\n").unwrap();
    let config = LoaderConfig::default().with_cache_dir(&cache);

    let (first, compiled_path) = {
        let mut catalog = Catalog::<f64>::new();
        let mut loader = RuntimeLoader::new(config.clone());
        loader.install(&mut catalog, Module::builtin(), None).unwrap();
        let report = loader.load_file(&mut catalog, &source).unwrap();

        let again = loader.load_file(&mut catalog, &source).unwrap();
        assert_eq!(again.outcome, LoadOutcome::NoDelta);
        (report, cache.join("metrica_nautical.module.json"))
    };
    assert_eq!(first.outcome, LoadOutcome::Compiled);
    assert_eq!(first.module.as_deref(), Some("metrica_nautical"));
    assert!(compiled_path.exists());

    // A new process finds the compiled module fresh
    let mut catalog = Catalog::<f64>::new();
    let mut loader = RuntimeLoader::new(config.clone());
    loader.install(&mut catalog, Module::builtin(), None).unwrap();
    let report = loader.load_file(&mut catalog, &source).unwrap();
    assert_eq!(report.outcome, LoadOutcome::Cached);
    assert!(catalog.find("nmi").is_some());

    // Touching the source makes the cache stale
    sleep(Duration::from_millis(1100));
    fs::write(&source, "unit NauticalMile \"nmi\" \"NM\" = 1852 * Meter;\n").unwrap();
    let mut catalog = Catalog::<f64>::new();
    let mut loader = RuntimeLoader::new(config);
    loader.install(&mut catalog, Module::builtin(), None).unwrap();
    let report = loader.load_file(&mut catalog, &source).unwrap();
    assert_eq!(report.outcome, LoadOutcome::Compiled);
    assert!(catalog.find("NM").is_some());
}

#[test]
fn decimal_catalog_extends_too() {
    use metrica_core::Number;

    let mut catalog: Catalog<Number> = Catalog::new();
    let mut loader = RuntimeLoader::new(LoaderConfig::default());
    loader.install(&mut catalog, Module::builtin(), None).unwrap();
    loader.load_str(&mut catalog, "unit Fathom \"ftm\" = 6 * Foot;").unwrap();

    let fathom = catalog.unit("ftm").unwrap();
    let meter = catalog.unit("m").unwrap();
    let q = meter.from(&fathom.quantity(Number::from_i64(1))).unwrap();
    assert!(q.value.approx_eq(&Number::from_str("1.8288").unwrap(), 30));
}

#[test]
fn fresh_families_skip_ids_already_in_the_catalog() {
    let (mut loader, mut catalog) = seeded();
    let next = catalog.max_family() + 1;
    catalog.add(UnitRef::new(Unit::new("Rogue", ["rg"], next, Dimension::LENGTH, 5.0))).unwrap();

    loader.load_str(&mut catalog, "unit Bit \"bit\" = <Other>;").unwrap();
    let bit = catalog.unit("bit").unwrap();
    let rogue = catalog.unit("rg").unwrap();
    assert_eq!(bit.family(), next + 1);
    assert!(rogue.from(&bit.quantity(1.0)).is_err());
    assert!(catalog.is_primary(catalog.find("bit").unwrap()));
}

#[test]
fn edited_file_reloads_in_the_same_loader() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("nautical.units");
    fs::write(&source, "unit NauticalMile \"nmi\" = 1852 * Meter;\n").unwrap();
    let config = LoaderConfig::default().with_cache_dir(dir.path());

    let mut catalog = Catalog::<f64>::new();
    let mut loader = RuntimeLoader::new(config);
    loader.install(&mut catalog, Module::builtin(), None).unwrap();
    assert_eq!(loader.load_file(&mut catalog, &source).unwrap().outcome, LoadOutcome::Compiled);

    sleep(Duration::from_millis(1100));
    fs::write(
        &source,
        "unit NauticalMile \"nmi\" = 1852 * Meter;\nunit Cable \"cb\" = 185.2 * Meter;\n",
    )
    .unwrap();

    let report = loader.load_file(&mut catalog, &source).unwrap();
    assert_eq!(report.outcome, LoadOutcome::Compiled);
    assert_eq!(report.added, 1);
    assert_eq!(report.module.as_deref(), Some("metrica_nautical_2"));
    assert!(dir.path().join("metrica_nautical_2.module.json").exists());
    let cable = catalog.unit("cb").unwrap();
    let nmi = catalog.unit("nmi").unwrap();
    assert!(close(nmi.from(&cable.quantity(10.0)).unwrap().value, 1.0));

    let again = loader.load_file(&mut catalog, &source).unwrap();
    assert_eq!(again.outcome, LoadOutcome::NoDelta);
    assert_eq!(loader.modules().len(), 3);
}

#[test]
fn runaway_exponents_are_rejected() {
    let (mut loader, mut catalog) = seeded();
    let before = symbols(&catalog);
    for text in [
        "unit Big \"bg\" = Meter^1000000000;",
        "unit Huge \"hg\" = <Length^2147483647*Length>;",
        "unit Huge \"hg\" = (((((<Length^64>)^64)^64)^64)^64)^64;",
    ] {
        let err = loader.load_str(&mut catalog, text).unwrap_err();
        assert_eq!(err.stage, LoadStage::Parse, "{}", text);
        assert_eq!(err.diagnostics[0].code, codes::GRAMMAR_ERROR, "{}", text);
    }
    assert_eq!(symbols(&catalog), before);
}
