use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use fleetmix_optimizer::{problem::fleet_problem::FleetProblem, solver::ranking::RankedFleet};

fn composition(problem: &FleetProblem, fleet: &RankedFleet) -> String {
    fleet
        .solution
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(index, count)| format!("{count} x {}", problem.archetype(index).label()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn fleets_table<'a>(
    problem: &FleetProblem,
    fleets: impl IntoIterator<Item = (String, &'a RankedFleet)>,
) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(vec![
        "Fleet",
        "Composition",
        "Yearly cost",
        "Yearly CO2e (kg)",
        "Unallocated",
        "Undriven km",
        "Goals",
    ]);

    for (name, fleet) in fleets {
        table.add_row(vec![
            name,
            composition(problem, fleet),
            format!("{:.0}", fleet.evaluation.yearly_cost),
            format!("{:.0}", fleet.evaluation.yearly_co2e),
            fleet.evaluation.unallocated_trips.to_string(),
            format!("{:.1}", fleet.evaluation.undriven_distance.value()),
            if fleet.meets_goals() {
                String::from("met")
            } else {
                format!("{} unmet", fleet.violations.len())
            },
        ]);
    }

    table
}
