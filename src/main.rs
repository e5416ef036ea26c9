use clap::{App, Arg, ArgMatches};
use log::info;
use nbrsect::{
    comm::{run_spmd, Comm, LocalComm},
    graph::{partition_vertex_pairs, EdgeProperty, GraphBuilder, GraphView},
    intersection::{nbr_intersection, reorder_to_global, NbrIntersection},
    loader,
    types::{VId, VertexPair},
};
use std::error::Error;

/// Runs the intersection on every process of the grid and merges the results
/// back into the order of `pairs`.
fn intersect<P>(
    shards: &[(GraphView, EdgeProperty<P>)],
    matches: &ArgMatches,
    pairs: &[VertexPair],
    with_property: bool,
) -> Result<NbrIntersection<P>, Box<dyn Error>>
where
    P: Copy + Send + Sync + 'static,
{
    let handles = LocalComm::grid(
        matches.value_of("major").unwrap().parse()?,
        matches.value_of("minor").unwrap().parse()?,
    )?;
    let do_expensive_check = matches.is_present("check");
    let (positions, local_pairs): (Vec<Vec<usize>>, Vec<Vec<VertexPair>>) =
        partition_vertex_pairs(shards[0].0.router(), pairs)
            .into_iter()
            .map(|local| -> (Vec<usize>, Vec<VertexPair>) { local.into_iter().unzip() })
            .unzip();
    let results = run_spmd(&handles, |handle| {
        let rank = handle.comm().rank();
        let (graph_view, edge_property) = &shards[rank];
        nbr_intersection(
            handle,
            graph_view,
            with_property.then(|| edge_property),
            &local_pairs[rank],
            [graph_view.stored_direction(); 2],
            do_expensive_check,
        )
    });
    let results = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(reorder_to_global(
        positions.into_iter().zip(results).collect(),
        pairs.len(),
    ))
}

fn print_rows<P, F>(pairs: &[VertexPair], result: &NbrIntersection<P>, format_nbr: F)
where
    F: Fn(VId, Option<(P, P)>) -> String,
    P: Copy,
{
    for (i, &(u, v)) in pairs.iter().enumerate() {
        let mut line = format!("{} {}", u, v);
        let values = result.row_properties(i);
        for (k, &nbr) in result.row(i).iter().enumerate() {
            line.push(' ');
            line.push_str(&format_nbr(nbr, values.map(|(first, second)| (first[k], second[k]))));
        }
        println!("{}", line);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let matches = App::new("nbr-intersect")
        .about("Intersects the neighbor sets of vertex pairs over a partitioned graph")
        .arg(Arg::with_name("SQLITE3").required(true))
        .arg(
            Arg::with_name("major")
                .long("major")
                .takes_value(true)
                .default_value("1")
                .help("size of the major communicator"),
        )
        .arg(
            Arg::with_name("minor")
                .long("minor")
                .takes_value(true)
                .default_value("1")
                .help("size of the minor communicator"),
        )
        .arg(
            Arg::with_name("check")
                .long("check")
                .help("verify that every pair is owned by the process issuing it"),
        )
        .arg(
            Arg::with_name("weighted")
                .long("weighted")
                .help("read edge weights and print them with every neighbor"),
        )
        .arg(Arg::with_name("symmetrize").long("symmetrize"))
        .arg(Arg::with_name("transposed").long("transposed"))
        .get_matches();
    let conn = rusqlite::Connection::open(matches.value_of("SQLITE3").unwrap())?;
    let builder = GraphBuilder::new(loader::read_number_of_vertices(&conn)?)
        .grid(
            matches.value_of("major").unwrap().parse()?,
            matches.value_of("minor").unwrap().parse()?,
        )
        .symmetrize(matches.is_present("symmetrize"))
        .transposed(matches.is_present("transposed"));
    let pairs = loader::read_pairs(&conn)?;
    let time_now = std::time::Instant::now();
    if matches.is_present("weighted") {
        let shards = builder.build(loader::read_weighted_edges(&conn)?)?;
        let result = intersect(&shards, &matches, &pairs, true)?;
        info!("intersection_time: {}", time_now.elapsed().as_millis());
        print_rows(&pairs, &result, |nbr, values| match values {
            Some((first, second)) => format!("{}:{}:{}", nbr, first, second),
            None => nbr.to_string(),
        });
    } else {
        let shards = builder.build_unweighted(loader::read_edges(&conn)?)?;
        let result = intersect(&shards, &matches, &pairs, false)?;
        info!("intersection_time: {}", time_now.elapsed().as_millis());
        print_rows(&pairs, &result, |nbr, _| nbr.to_string());
    }
    Ok(())
}
